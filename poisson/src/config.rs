/// How long the engine runs before pausing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunLength {
    /// Never pause.
    Infinite,
    /// Pause when the tick counter reaches this value.
    Ticks(u32),
}

/// Configuration for the [Engine](super::Engine).
#[derive(Clone, Debug)]
pub struct Config {
    /// Whether to record which sources fired each tick.
    pub recording: bool,

    /// Run length until the first pause.
    pub run_length: RunLength,

    /// Length of one tick in clock cycles (bounds the pacing of events).
    pub cycles_per_tick: u64,

    /// Store channel receiving recording records.
    pub recording_channel: u8,
}
