//! A [crate::Clock] backed by the host's monotonic timer.

use std::{sync::Arc, time::Instant};

/// Monotonic clock counting nanoseconds since construction.
#[derive(Clone, Debug)]
pub struct Clock {
    epoch: Arc<Instant>,
}

impl Clock {
    /// Creates a clock starting at zero.
    pub fn new() -> Self {
        Self {
            epoch: Arc::new(Instant::now()),
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::Clock for Clock {
    fn cycles(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX)
    }

    fn delay(&self, cycles: u64) {
        let until = self.cycles().saturating_add(cycles);
        while self.cycles() < until {
            std::hint::spin_loop();
        }
    }
}
