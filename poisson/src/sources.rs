//! Per-source scheduling state.

use crate::{
    generate::initial_phase,
    params::{GlobalParameters, Regime, Source},
    Error,
};
use bytes::BytesMut;
use neurocore_codec::{FixedSize, Write};
use neurocore_math::{Accum, UFract};
use rand::RngCore;
use tracing::trace;

/// Converts a rate into per-tick regime thresholds and constants.
#[derive(Clone, Copy, Debug)]
pub struct RateMap {
    /// Length of one tick in seconds.
    pub seconds_per_tick: UFract,
    /// Per-tick rates below this use the slow regime.
    pub slow_cutoff: Accum,
    /// Per-tick rates at or above this use the faster regime.
    pub fast_cutoff: Accum,
}

impl RateMap {
    /// Derives the regime for a rate in Hz.
    ///
    /// A slow source draws its first phase from `rng`.
    pub fn regime<R: RngCore + ?Sized>(&self, rate: Accum, rng: &mut R) -> Regime {
        let per_tick = rate.mul_fract(self.seconds_per_tick);
        if per_tick >= self.fast_cutoff {
            Regime::Faster {
                sqrt_lambda: per_tick.sqrt(),
            }
        } else if per_tick >= self.slow_cutoff {
            Regime::Fast {
                exp_minus_lambda: UFract::exp_neg(per_tick),
            }
        } else {
            let mean_isi_ticks = per_tick.recip_floor();
            Regime::Slow {
                mean_isi_ticks,
                phase: initial_phase(rng, mean_isi_ticks),
            }
        }
    }
}

impl From<&GlobalParameters> for RateMap {
    fn from(globals: &GlobalParameters) -> Self {
        Self {
            seconds_per_tick: globals.seconds_per_tick,
            slow_cutoff: globals.slow_cutoff,
            fast_cutoff: globals.fast_cutoff,
        }
    }
}

/// Descriptors of the sources owned by this node.
#[derive(Clone, Debug)]
pub struct SourceTable {
    first_source_id: u32,
    rates: RateMap,
    sources: Vec<Source>,
}

impl SourceTable {
    pub fn new(globals: &GlobalParameters, sources: Vec<Source>) -> Self {
        Self {
            first_source_id: globals.first_source_id,
            rates: RateMap::from(globals),
            sources,
        }
    }

    /// Number of owned sources.
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns `true` if no source is owned.
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Returns the descriptor at `index`.
    pub fn read(&self, index: usize) -> Option<&Source> {
        self.sources.get(index)
    }

    /// Returns all descriptors in index order.
    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub(crate) fn sources_mut(&mut self) -> &mut [Source] {
        &mut self.sources
    }

    /// Maps a global source id to a local index, if owned.
    pub fn index_of(&self, id: u32) -> Option<usize> {
        let index = id.checked_sub(self.first_source_id)? as usize;
        (index < self.sources.len()).then_some(index)
    }

    /// Sets the rate (in Hz) of source `id`, replacing its descriptor.
    ///
    /// Returns `false` (leaving the table untouched) if `id` is not owned.
    pub fn set_rate<R: RngCore + ?Sized>(&mut self, id: u32, rate: Accum, rng: &mut R) -> bool {
        let Some(index) = self.index_of(id) else {
            trace!(id, "ignoring rate for unowned source");
            return false;
        };
        let source = &mut self.sources[index];
        *source = Source {
            start: source.start,
            end: source.end,
            regime: self.rates.regime(rate, rng),
        };
        trace!(id, %rate, regime = ?source.regime, "set rate");
        true
    }

    /// Replaces every descriptor with a reloaded copy.
    pub fn replace(&mut self, sources: Vec<Source>) -> Result<(), Error> {
        if sources.len() != self.sources.len() {
            return Err(Error::SourceCountMismatch {
                expected: self.sources.len(),
                found: sources.len(),
            });
        }
        self.sources = sources;
        Ok(())
    }

    /// Draws a first phase for every slow source, ignoring the loaded one.
    pub fn draw_phases<R: RngCore + ?Sized>(&mut self, rng: &mut R) {
        self.redraw(rng, false);
    }

    /// Redraws the phase of every slow source whose phase is exactly zero.
    pub fn redraw_zero_phases<R: RngCore + ?Sized>(&mut self, rng: &mut R) {
        self.redraw(rng, true);
    }

    fn redraw<R: RngCore + ?Sized>(&mut self, rng: &mut R, only_zero: bool) {
        for source in &mut self.sources {
            if let Regime::Slow {
                mean_isi_ticks,
                phase,
            } = &mut source.regime
            {
                if !only_zero || *phase == 0 {
                    *phase = initial_phase(rng, *mean_isi_ticks);
                }
            }
        }
    }

    /// Encodes the descriptors as they appear in the parameter block.
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.sources.len() * Source::SIZE);
        for source in &self.sources {
            source.write(&mut buf);
        }
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use commonware_macros::test_traced;
    use neurocore_math::Kiss64;

    fn globals() -> GlobalParameters {
        GlobalParameters {
            key: None,
            mask: u32::MAX,
            timer_offset: 0,
            time_between_spikes: 0,
            seconds_per_tick: UFract::from_f64(0.001),
            ticks_per_second: 1000,
            slow_cutoff: Accum::ONE,
            fast_cutoff: Accum::from_int(10),
            first_source_id: 100,
            n_sources: 2,
            seed: Kiss64::DEFAULT_SEED,
        }
    }

    fn table() -> SourceTable {
        let silent = Source {
            start: 0,
            end: 1_000,
            regime: Regime::Slow {
                mean_isi_ticks: 0,
                phase: 0,
            },
        };
        SourceTable::new(&globals(), vec![silent; 2])
    }

    #[test_traced]
    fn test_regime_selection() {
        let mut rng = Kiss64::default();
        let mut table = table();

        // 100 Hz at 1 ms ticks is ~0.1 per tick
        assert!(table.set_rate(100, Accum::from_int(100), &mut rng));
        let Regime::Slow { mean_isi_ticks, .. } = table.read(0).unwrap().regime else {
            panic!("expected slow regime");
        };
        assert_eq!(mean_isi_ticks, 10);

        // 2000 Hz is ~2 per tick
        assert!(table.set_rate(101, Accum::from_int(2_000), &mut rng));
        let Regime::Fast { exp_minus_lambda } = table.read(1).unwrap().regime else {
            panic!("expected fast regime");
        };
        assert!((exp_minus_lambda.to_f64() - (-2f64).exp()).abs() < 1e-3);

        // 25000 Hz is ~25 per tick
        assert!(table.set_rate(101, Accum::from_int(25_000), &mut rng));
        let Regime::Faster { sqrt_lambda } = table.read(1).unwrap().regime else {
            panic!("expected faster regime");
        };
        assert!((sqrt_lambda.to_f64() - 5.0).abs() < 1e-2);

        // Window is preserved
        assert_eq!(table.read(1).unwrap().end, 1_000);
    }

    #[test_traced]
    fn test_cutoffs_are_inclusive() {
        let mut rng = Kiss64::default();
        let rates = RateMap {
            seconds_per_tick: UFract::MAX,
            slow_cutoff: Accum::ONE,
            fast_cutoff: Accum::from_int(10),
        };
        // Multiplying by UFract::MAX loses one LSB, so add it back
        let at = |value: i16| Accum::from_bits(Accum::from_int(value).to_bits() + 1);
        assert!(matches!(rates.regime(at(1), &mut rng), Regime::Fast { .. }));
        assert!(matches!(rates.regime(at(10), &mut rng), Regime::Faster { .. }));
        assert!(matches!(
            rates.regime(Accum::from_f64(0.5), &mut rng),
            Regime::Slow { .. }
        ));
    }

    #[test_traced]
    fn test_zero_rate_is_silent_slow() {
        let mut rng = Kiss64::default();
        let mut table = table();
        table.set_rate(100, Accum::ZERO, &mut rng);
        assert_eq!(
            table.read(0).unwrap().regime,
            Regime::Slow {
                mean_isi_ticks: 0,
                phase: 0
            }
        );
    }

    #[test_traced]
    fn test_unowned_rate_is_ignored() {
        let mut rng = Kiss64::default();
        let mut table = table();
        table.set_rate(100, Accum::from_int(50), &mut rng);
        let before = table.encode();
        let state = rng.state();

        assert!(!table.set_rate(99, Accum::from_int(500), &mut rng));
        assert!(!table.set_rate(102, Accum::from_int(500), &mut rng));
        assert!(!table.set_rate(0, Accum::from_int(500), &mut rng));
        assert_eq!(table.encode(), before);
        assert_eq!(rng.state(), state);
    }

    #[test_traced]
    fn test_index_of() {
        let table = table();
        assert_eq!(table.index_of(99), None);
        assert_eq!(table.index_of(100), Some(0));
        assert_eq!(table.index_of(101), Some(1));
        assert_eq!(table.index_of(102), None);
    }

    #[test_traced]
    fn test_replace_checks_count() {
        let mut table = table();
        let sources = table.sources()[..1].to_vec();
        assert!(matches!(
            table.replace(sources),
            Err(Error::SourceCountMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test_traced]
    fn test_redraw_zero_phases() {
        let mut rng = Kiss64::default();
        let mut table = table();
        table.sources_mut()[0].regime = Regime::Slow {
            mean_isi_ticks: 10,
            phase: 0,
        };
        table.sources_mut()[1].regime = Regime::Slow {
            mean_isi_ticks: 10,
            phase: 7,
        };
        table.redraw_zero_phases(&mut rng);
        let Regime::Slow { phase, .. } = table.read(0).unwrap().regime else {
            panic!("expected slow regime");
        };
        assert_ne!(phase, 0);
        assert_eq!(
            table.read(1).unwrap().regime,
            Regime::Slow {
                mean_isi_ticks: 10,
                phase: 7
            }
        );
    }

    #[test_traced]
    fn test_draw_phases() {
        let mut rng = Kiss64::default();
        let mut table = table();
        table.sources_mut()[0].regime = Regime::Slow {
            mean_isi_ticks: 10,
            phase: 7,
        };
        let fast = Regime::Fast {
            exp_minus_lambda: UFract::MAX,
        };
        table.sources_mut()[1].regime = fast;
        table.draw_phases(&mut rng);

        // Every slow phase is drawn, loaded ones included
        let mut replay = Kiss64::default();
        let expected = initial_phase(&mut replay, 10);
        assert_eq!(
            table.read(0).unwrap().regime,
            Regime::Slow {
                mean_isi_ticks: 10,
                phase: expected
            }
        );
        assert_eq!(table.read(1).unwrap().regime, fast);
        assert_eq!(rng.state(), replay.state());
    }
}
