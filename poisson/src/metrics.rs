use prometheus_client::{
    metrics::{counter::Counter, gauge::Gauge},
    registry::Registry,
};

/// Metrics for the [Engine](crate::Engine).
#[derive(Clone, Default)]
pub struct Metrics {
    /// Ticks processed.
    pub ticks: Counter,
    /// Events generated.
    pub spikes: Counter,
    /// Recording records written.
    pub flushes: Counter,
    /// Rate updates applied to an owned source.
    pub rates_applied: Counter,
    /// Rate updates ignored (unowned source or malformed message).
    pub rates_ignored: Counter,
    /// Events whose pacing target fell past the end of the tick.
    pub pacing_overruns: Counter,
    /// Sends retried because the outbound queue was full.
    pub fabric_retries: Counter,
    /// Recording sub-buffers allocated.
    pub sub_buffers: Gauge,
}

impl Metrics {
    /// Create and return a new set of metrics, registered with the given registry.
    pub fn init(registry: &mut Registry) -> Self {
        let metrics = Self::default();
        registry.register("ticks", "Ticks processed", metrics.ticks.clone());
        registry.register("spikes", "Events generated", metrics.spikes.clone());
        registry.register(
            "flushes",
            "Recording records written",
            metrics.flushes.clone(),
        );
        registry.register(
            "rates_applied",
            "Rate updates applied to an owned source",
            metrics.rates_applied.clone(),
        );
        registry.register(
            "rates_ignored",
            "Rate updates ignored",
            metrics.rates_ignored.clone(),
        );
        registry.register(
            "pacing_overruns",
            "Events whose pacing target fell past the end of the tick",
            metrics.pacing_overruns.clone(),
        );
        registry.register(
            "fabric_retries",
            "Sends retried because the outbound queue was full",
            metrics.fabric_retries.clone(),
        );
        registry.register(
            "sub_buffers",
            "Recording sub-buffers allocated",
            metrics.sub_buffers.clone(),
        );
        metrics
    }
}
