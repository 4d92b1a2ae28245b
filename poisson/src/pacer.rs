//! Spread outbound events across a tick.
//!
//! The `n`-th event of a tick is held until `spacing * n` cycles after the
//! tick started, unless the tick boundary has already passed. Events that
//! cannot be spaced within the tick are sent immediately and counted as
//! overruns.

use neurocore_runtime::{Clock, Fabric};
use prometheus_client::metrics::counter::Counter;
use tracing::{trace, warn};

/// Cycles to wait before retrying a send to a full outbound queue.
pub const RETRY_DELAY: u64 = 200;

/// Paces events onto the fabric.
pub struct Pacer<C: Clock, F: Fabric> {
    clock: C,
    fabric: F,
    spacing: u64,
    cycles_per_tick: u64,

    tick_start: u64,
    emitted: u64,
    overrun: bool,

    overruns: Counter,
    retries: Counter,
}

impl<C: Clock, F: Fabric> Pacer<C, F> {
    pub fn new(
        clock: C,
        fabric: F,
        spacing: u64,
        cycles_per_tick: u64,
        overruns: Counter,
        retries: Counter,
    ) -> Self {
        Self {
            clock,
            fabric,
            spacing,
            cycles_per_tick,
            tick_start: 0,
            emitted: 0,
            overrun: false,
            overruns,
            retries,
        }
    }

    /// Marks the start of a tick.
    pub fn start_tick(&mut self) {
        self.tick_start = self.clock.cycles();
        self.emitted = 0;
        self.overrun = false;
    }

    /// Sends one event, waiting for its slot in the tick.
    pub fn emit(&mut self, key: u32) {
        let offset = self.spacing.saturating_mul(self.emitted);
        let target = self.tick_start.saturating_add(offset);
        let end = self.tick_start.saturating_add(self.cycles_per_tick);
        if offset >= self.cycles_per_tick {
            self.overruns.inc();
            if !self.overrun {
                self.overrun = true;
                warn!(emitted = self.emitted, "pacing overran tick");
            }
        }
        loop {
            let now = self.clock.cycles();
            if now >= target || now >= end {
                break;
            }
            std::hint::spin_loop();
        }
        while !self.fabric.try_send(key) {
            self.retries.inc();
            trace!(key, "outbound queue full");
            self.clock.delay(RETRY_DELAY);
        }
        self.emitted += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_macros::test_traced;
    use neurocore_runtime::deterministic::{self, Sent};

    fn pacer(
        spacing: u64,
        cycles_per_tick: u64,
    ) -> (
        Pacer<deterministic::Clock, deterministic::Fabric>,
        deterministic::Clock,
        deterministic::Fabric,
    ) {
        let clock = deterministic::Clock::default();
        let fabric = deterministic::Fabric::new(clock.clone());
        let pacer = Pacer::new(
            clock.clone(),
            fabric.clone(),
            spacing,
            cycles_per_tick,
            Counter::default(),
            Counter::default(),
        );
        (pacer, clock, fabric)
    }

    #[test_traced]
    fn test_events_are_spaced() {
        let (mut pacer, _, fabric) = pacer(100, 1_000);
        pacer.start_tick();
        for key in 0..5 {
            pacer.emit(key);
        }
        let sent = fabric.sent();
        assert_eq!(sent.len(), 5);
        // The tick started at cycle 0
        for (n, Sent { key, at }) in sent.iter().enumerate() {
            assert_eq!(*key, n as u32);
            let target = 100 * n as u64;
            assert!(*at >= target && *at < target + 10, "event {n} at {at}");
        }
        assert_eq!(pacer.overruns.get(), 0);
    }

    #[test_traced]
    fn test_overrun_is_counted() {
        let (mut pacer, clock, fabric) = pacer(100, 1_000);
        pacer.start_tick();
        for key in 0..20 {
            pacer.emit(key);
        }
        assert_eq!(fabric.sent().len(), 20);
        assert_eq!(pacer.overruns.get(), 10);
        // Overrun events are not held past the tick boundary
        assert!(clock.peek() < 1_100);
    }

    #[test_traced]
    fn test_full_queue_is_retried() {
        let (mut pacer, clock, fabric) = pacer(0, 1_000);
        pacer.start_tick();
        fabric.reject_next(3);
        let before = clock.peek();
        pacer.emit(9);
        assert_eq!(fabric.sent().len(), 1);
        assert_eq!(fabric.rejected(), 3);
        assert_eq!(pacer.retries.get(), 3);
        assert!(clock.peek() >= before + 3 * RETRY_DELAY);
    }
}
