//! A deterministic clock and interconnect for tests and simulation.
//!
//! The [Clock] never reads host time: every call to [crate::Clock::cycles]
//! advances it by a configured cycle so that busy-waits always terminate, and
//! [crate::Clock::delay] advances it by exactly the requested amount. The
//! [Fabric] records every accepted packet together with the cycle it was
//! accepted at and can be told to reject a number of upcoming sends.
//!
//! # Example
//!
//! ```rust
//! use neurocore_runtime::{deterministic, Clock as _, Fabric as _};
//!
//! let clock = deterministic::Clock::new(deterministic::Config { cycle: 10 });
//! let fabric = deterministic::Fabric::new(clock.clone());
//! assert_eq!(clock.cycles(), 0);
//! assert!(fabric.try_send(7));
//! assert_eq!(fabric.sent()[0].key, 7);
//! ```

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use tracing::trace;

/// Configuration for the deterministic [Clock].
#[derive(Clone, Copy, Debug)]
pub struct Config {
    /// Cycles added after each read of the clock. Must be non-zero.
    pub cycle: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self { cycle: 1 }
    }
}

/// A cycle counter that advances only when observed or explicitly moved.
#[derive(Clone, Debug)]
pub struct Clock {
    cycle: u64,
    now: Arc<AtomicU64>,
}

impl Clock {
    /// Creates a clock at cycle zero.
    ///
    /// # Panics
    ///
    /// Panics if `cfg.cycle` is zero.
    pub fn new(cfg: Config) -> Self {
        assert!(cfg.cycle > 0, "cycle must be non-zero");
        Self {
            cycle: cfg.cycle,
            now: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns the current cycle count without advancing it.
    pub fn peek(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    /// Moves the clock forward by `cycles`.
    pub fn advance(&self, cycles: u64) {
        self.now.fetch_add(cycles, Ordering::SeqCst);
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl crate::Clock for Clock {
    fn cycles(&self) -> u64 {
        self.now.fetch_add(self.cycle, Ordering::SeqCst)
    }

    fn delay(&self, cycles: u64) {
        self.advance(cycles);
    }
}

/// A packet accepted by the [Fabric].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sent {
    /// Routing key of the packet.
    pub key: u32,
    /// Clock reading when the packet was accepted.
    pub at: u64,
}

#[derive(Default)]
struct State {
    sent: Vec<Sent>,
    reject: usize,
    rejected: usize,
}

/// An interconnect that records accepted packets.
#[derive(Clone)]
pub struct Fabric {
    clock: Clock,
    state: Arc<Mutex<State>>,
}

impl Fabric {
    /// Creates a fabric that stamps accepted packets with `clock`.
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// Reports a full outbound queue for the next `count` sends.
    pub fn reject_next(&self, count: usize) {
        self.state.lock().unwrap().reject += count;
    }

    /// Returns every accepted packet, oldest first.
    pub fn sent(&self) -> Vec<Sent> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Returns the number of sends refused so far.
    pub fn rejected(&self) -> usize {
        self.state.lock().unwrap().rejected
    }

    /// Drops all recorded packets.
    pub fn clear(&self) {
        self.state.lock().unwrap().sent.clear();
    }
}

impl crate::Fabric for Fabric {
    fn try_send(&self, key: u32) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.reject > 0 {
            state.reject -= 1;
            state.rejected += 1;
            trace!(key, "rejected send");
            return false;
        }
        let at = self.clock.peek();
        state.sent.push(Sent { key, at });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Clock as _, Fabric as _};
    use commonware_macros::test_traced;

    #[test_traced]
    fn test_clock_advances_on_read() {
        let clock = Clock::new(Config { cycle: 3 });
        assert_eq!(clock.cycles(), 0);
        assert_eq!(clock.cycles(), 3);
        assert_eq!(clock.peek(), 6);
        clock.delay(100);
        assert_eq!(clock.cycles(), 106);
    }

    #[test_traced]
    fn test_clock_shared_between_clones() {
        let clock = Clock::default();
        let other = clock.clone();
        other.advance(50);
        assert_eq!(clock.peek(), 50);
    }

    #[test]
    #[should_panic(expected = "cycle must be non-zero")]
    fn test_clock_zero_cycle() {
        Clock::new(Config { cycle: 0 });
    }

    #[test_traced]
    fn test_fabric_records_sends() {
        let clock = Clock::default();
        let fabric = Fabric::new(clock.clone());
        assert!(fabric.try_send(1));
        clock.advance(9);
        assert!(fabric.try_send(2));
        assert_eq!(
            fabric.sent(),
            vec![Sent { key: 1, at: 0 }, Sent { key: 2, at: 9 }]
        );
        fabric.clear();
        assert!(fabric.sent().is_empty());
    }

    #[test_traced]
    fn test_fabric_rejects() {
        let fabric = Fabric::new(Clock::default());
        fabric.reject_next(2);
        assert!(!fabric.try_send(1));
        assert!(!fabric.try_send(1));
        assert!(fabric.try_send(1));
        assert_eq!(fabric.rejected(), 2);
        assert_eq!(fabric.sent().len(), 1);
    }
}
