//! Diagnostic counters written when a run pauses.

use crate::Metrics;
use bytes::{Buf, BufMut};
use neurocore_codec::{Error, FixedSize, Read, ReadExt, Write};

/// Counters accumulated since the engine started.
///
/// Each counter is one little-endian word, saturating at `u32::MAX`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Provenance {
    pub ticks: u32,
    pub spikes: u32,
    pub flushes: u32,
    pub rates_ignored: u32,
    pub pacing_overruns: u32,
    pub fabric_retries: u32,
}

fn saturate(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

impl From<&Metrics> for Provenance {
    fn from(metrics: &Metrics) -> Self {
        Self {
            ticks: saturate(metrics.ticks.get()),
            spikes: saturate(metrics.spikes.get()),
            flushes: saturate(metrics.flushes.get()),
            rates_ignored: saturate(metrics.rates_ignored.get()),
            pacing_overruns: saturate(metrics.pacing_overruns.get()),
            fabric_retries: saturate(metrics.fabric_retries.get()),
        }
    }
}

impl Write for Provenance {
    fn write(&self, buf: &mut impl BufMut) {
        self.ticks.write(buf);
        self.spikes.write(buf);
        self.flushes.write(buf);
        self.rates_ignored.write(buf);
        self.pacing_overruns.write(buf);
        self.fabric_retries.write(buf);
    }
}

impl Read for Provenance {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        Ok(Self {
            ticks: u32::read(buf)?,
            spikes: u32::read(buf)?,
            flushes: u32::read(buf)?,
            rates_ignored: u32::read(buf)?,
            pacing_overruns: u32::read(buf)?,
            fabric_retries: u32::read(buf)?,
        })
    }
}

impl FixedSize for Provenance {
    const SIZE: usize = 6 * u32::SIZE;
}
