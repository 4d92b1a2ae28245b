//! Persisted parameter block.
//!
//! The block is the global run parameters immediately followed by one
//! fixed-size descriptor per owned source. Every field is a little-endian
//! word:
//!
//! ```txt
//! globals (60 bytes):
//!   has_key | key | mask | timer_offset | time_between_spikes |
//!   seconds_per_tick | ticks_per_second | slow_cutoff | fast_cutoff |
//!   first_source_id | n_sources | seed[4]
//! source (20 bytes):
//!   start | end | regime | a | b
//! ```
//!
//! The meaning of `a` and `b` depends on the regime tag:
//!
//! | regime     | tag | a                  | b     |
//! |------------|-----|--------------------|-------|
//! | slow       | 0   | mean gap (ticks)   | phase |
//! | fast       | 1   | `exp(-lambda)`     | 0     |
//! | faster     | 2   | `sqrt(lambda)`     | 0     |

use bytes::{Buf, BufMut};
use neurocore_codec::{util::at_least, EncodeSize, Error, FixedSize, Read, ReadExt, Write};
use neurocore_math::{Accum, UFract};

/// Global run parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalParameters {
    /// Routing key of outbound events (`None` records without transmitting).
    pub key: Option<u32>,

    /// Mask applied to the key of an inbound rate update to find the source id.
    pub mask: u32,

    /// Offset (in cycles) of this node's timer from the global tick.
    pub timer_offset: u32,

    /// Cycles to leave between consecutive outbound events.
    pub time_between_spikes: u32,

    /// Length of one tick in seconds.
    pub seconds_per_tick: UFract,

    /// Number of ticks in one second.
    pub ticks_per_second: u32,

    /// Per-tick rates below this use the slow regime.
    pub slow_cutoff: Accum,

    /// Per-tick rates at or above this use the faster regime.
    pub fast_cutoff: Accum,

    /// Id of the first owned source.
    pub first_source_id: u32,

    /// Number of owned sources.
    pub n_sources: u32,

    /// Generator state.
    pub seed: [u32; 4],
}

impl Write for GlobalParameters {
    fn write(&self, buf: &mut impl BufMut) {
        self.key.is_some().write(buf);
        self.key.unwrap_or(0).write(buf);
        self.mask.write(buf);
        self.timer_offset.write(buf);
        self.time_between_spikes.write(buf);
        self.seconds_per_tick.to_bits().write(buf);
        self.ticks_per_second.write(buf);
        self.slow_cutoff.to_bits().write(buf);
        self.fast_cutoff.to_bits().write(buf);
        self.first_source_id.write(buf);
        self.n_sources.write(buf);
        self.seed.write(buf);
    }
}

impl Read for GlobalParameters {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        let has_key = bool::read(buf)?;
        let key = u32::read(buf)?;
        if !has_key && key != 0 {
            return Err(Error::Invalid("GlobalParameters", "key set without has_key"));
        }
        Ok(Self {
            key: has_key.then_some(key),
            mask: u32::read(buf)?,
            timer_offset: u32::read(buf)?,
            time_between_spikes: u32::read(buf)?,
            seconds_per_tick: UFract::from_bits(u32::read(buf)?),
            ticks_per_second: u32::read(buf)?,
            slow_cutoff: Accum::from_bits(i32::read(buf)?),
            fast_cutoff: Accum::from_bits(i32::read(buf)?),
            first_source_id: u32::read(buf)?,
            n_sources: u32::read(buf)?,
            seed: <[u32; 4]>::read(buf)?,
        })
    }
}

impl FixedSize for GlobalParameters {
    const SIZE: usize = 11 * u32::SIZE + <[u32; 4]>::SIZE;
}

/// Regime-specific scheduling state of a source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Regime {
    /// Renewal process with exponentially distributed gaps.
    Slow {
        /// Mean gap between events in whole ticks (`0` never fires).
        mean_isi_ticks: u32,
        /// Countdown to the next event in thousandths of a tick.
        phase: u32,
    },
    /// Poisson count drawn every tick.
    Fast {
        /// Probability of zero events in one tick.
        exp_minus_lambda: UFract,
    },
    /// Gaussian approximation of a Poisson count.
    Faster {
        /// Square root of the per-tick rate.
        sqrt_lambda: Accum,
    },
}

impl Regime {
    const SLOW: u32 = 0;
    const FAST: u32 = 1;
    const FASTER: u32 = 2;
}

impl Write for Regime {
    fn write(&self, buf: &mut impl BufMut) {
        let (tag, a, b) = match *self {
            Regime::Slow {
                mean_isi_ticks,
                phase,
            } => (Self::SLOW, mean_isi_ticks, phase),
            Regime::Fast { exp_minus_lambda } => (Self::FAST, exp_minus_lambda.to_bits(), 0),
            Regime::Faster { sqrt_lambda } => (Self::FASTER, sqrt_lambda.to_bits() as u32, 0),
        };
        tag.write(buf);
        a.write(buf);
        b.write(buf);
    }
}

impl Read for Regime {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        let tag = u32::read(buf)?;
        let a = u32::read(buf)?;
        let b = u32::read(buf)?;
        let regime = match tag {
            Self::SLOW => {
                return Ok(Regime::Slow {
                    mean_isi_ticks: a,
                    phase: b,
                })
            }
            Self::FAST => Regime::Fast {
                exp_minus_lambda: UFract::from_bits(a),
            },
            Self::FASTER => Regime::Faster {
                sqrt_lambda: Accum::from_bits(a as i32),
            },
            _ => return Err(Error::InvalidTag("Regime", tag)),
        };
        if b != 0 {
            return Err(Error::Invalid("Regime", "reserved word must be zero"));
        }
        Ok(regime)
    }
}

impl FixedSize for Regime {
    const SIZE: usize = 3 * u32::SIZE;
}

/// Descriptor of one source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Source {
    /// First tick the source may fire.
    pub start: u32,
    /// First tick the source no longer fires.
    pub end: u32,
    /// Scheduling state.
    pub regime: Regime,
}

impl Source {
    /// Returns `true` if `time` lies within `[start, end)`.
    #[inline]
    pub fn is_active(&self, time: u32) -> bool {
        self.start <= time && time < self.end
    }
}

impl Write for Source {
    fn write(&self, buf: &mut impl BufMut) {
        self.start.write(buf);
        self.end.write(buf);
        self.regime.write(buf);
    }
}

impl Read for Source {
    type Cfg = ();

    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        Ok(Self {
            start: u32::read(buf)?,
            end: u32::read(buf)?,
            regime: Regime::read(buf)?,
        })
    }
}

impl FixedSize for Source {
    const SIZE: usize = 2 * u32::SIZE + Regime::SIZE;
}

/// Global parameters and the descriptors of every owned source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterBlock {
    pub globals: GlobalParameters,
    pub sources: Vec<Source>,
}

impl Write for ParameterBlock {
    fn write(&self, buf: &mut impl BufMut) {
        self.globals.write(buf);
        for source in &self.sources {
            source.write(buf);
        }
    }
}

impl EncodeSize for ParameterBlock {
    fn encode_size(&self) -> usize {
        GlobalParameters::SIZE + self.sources.len() * Source::SIZE
    }
}

impl Read for ParameterBlock {
    type Cfg = ();

    /// Reads the block from the start of a region, ignoring any unused tail.
    fn read_cfg(buf: &mut impl Buf, _: &()) -> Result<Self, Error> {
        let globals = GlobalParameters::read(buf)?;
        let n_sources = globals.n_sources as usize;
        let len = n_sources
            .checked_mul(Source::SIZE)
            .ok_or(Error::InvalidLength(n_sources))?;
        at_least(buf, len)?;
        let sources = (0..n_sources)
            .map(|_| Source::read(buf))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { globals, sources })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocore_codec::{DecodeExt, Encode};

    fn sample() -> ParameterBlock {
        ParameterBlock {
            globals: GlobalParameters {
                key: Some(0x0001_0000),
                mask: 0xFF,
                timer_offset: 12,
                time_between_spikes: 100,
                seconds_per_tick: UFract::from_f64(0.001),
                ticks_per_second: 1000,
                slow_cutoff: Accum::ONE,
                fast_cutoff: Accum::from_int(10),
                first_source_id: 32,
                n_sources: 3,
                seed: [1, 2, 3, 4],
            },
            sources: vec![
                Source {
                    start: 0,
                    end: u32::MAX,
                    regime: Regime::Slow {
                        mean_isi_ticks: 10,
                        phase: 4321,
                    },
                },
                Source {
                    start: 5,
                    end: 50,
                    regime: Regime::Fast {
                        exp_minus_lambda: UFract::from_f64(0.25),
                    },
                },
                Source {
                    start: 0,
                    end: 10,
                    regime: Regime::Faster {
                        sqrt_lambda: Accum::from_f64(4.5),
                    },
                },
            ],
        }
    }

    #[test]
    fn test_block_layout() {
        let block = sample();
        let encoded = block.encode();
        assert_eq!(encoded.len(), 60 + 3 * 20);
        assert_eq!(&encoded[..8], &[1, 0, 0, 0, 0, 0, 1, 0]);
        // Second source starts after globals and one descriptor
        let second = &encoded[80..100];
        assert_eq!(&second[..4], &5u32.to_le_bytes());
        assert_eq!(&second[8..12], &1u32.to_le_bytes());
        assert_eq!(&second[16..], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_block_reload_is_exact() {
        let block = sample();
        let encoded = block.encode();
        let decoded = ParameterBlock::decode(encoded.clone()).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(decoded.encode(), encoded);
    }

    #[test]
    fn test_block_ignores_region_tail() {
        let block = sample();
        let mut region = block.encode().to_vec();
        region.extend_from_slice(&[0xAA; 16]);
        let decoded = ParameterBlock::read(&mut &region[..]).unwrap();
        assert_eq!(decoded, block);
    }

    #[test]
    fn test_block_truncated() {
        let encoded = sample().encode();
        let result = ParameterBlock::read(&mut &encoded[..encoded.len() - 4]);
        assert_eq!(result, Err(Error::EndOfBuffer));
    }

    #[test]
    fn test_absent_key() {
        let mut block = sample();
        block.globals.key = None;
        let encoded = block.encode();
        assert_eq!(&encoded[..8], &[0; 8]);
        assert_eq!(ParameterBlock::decode(encoded).unwrap().globals.key, None);
    }

    #[test]
    fn test_key_without_flag_rejected() {
        let mut encoded = sample().encode();
        encoded[0] = 0;
        assert_eq!(
            GlobalParameters::read(&mut &encoded[..]),
            Err(Error::Invalid("GlobalParameters", "key set without has_key"))
        );
    }

    #[test]
    fn test_invalid_regime() {
        let mut encoded = Source {
            start: 0,
            end: 1,
            regime: Regime::Fast {
                exp_minus_lambda: UFract::MAX,
            },
        }
        .encode();
        encoded[8] = 7;
        assert_eq!(
            Source::decode(encoded.clone()),
            Err(Error::InvalidTag("Regime", 7))
        );
        encoded[8] = 1;
        encoded[16] = 1;
        assert_eq!(
            Source::decode(encoded),
            Err(Error::Invalid("Regime", "reserved word must be zero"))
        );
    }

    #[test]
    fn test_active_window() {
        let source = sample().sources[1];
        assert!(!source.is_active(4));
        assert!(source.is_active(5));
        assert!(source.is_active(49));
        assert!(!source.is_active(50));
    }
}
