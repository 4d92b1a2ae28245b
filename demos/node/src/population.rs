//! Population file describing the sources owned by a node.

use neurocore_codec::Encode;
use neurocore_math::{Accum, Kiss64, UFract};
use neurocore_poisson::{
    params::{GlobalParameters, ParameterBlock, Source},
    sources::RateMap,
    RateUpdate,
};
use serde::{Deserialize, Serialize};

fn default_mask() -> u32 {
    u32::MAX
}

fn default_slow_cutoff() -> f64 {
    1.0
}

fn default_fast_cutoff() -> f64 {
    10.0
}

fn default_end() -> u32 {
    u32::MAX
}

#[derive(Deserialize, Serialize)]
pub struct Population {
    pub ticks_per_second: u32,
    /// Routing key of outbound events (omit to only record).
    #[serde(default)]
    pub key: Option<u32>,
    #[serde(default = "default_mask")]
    pub mask: u32,
    #[serde(default)]
    pub time_between_spikes: u32,
    #[serde(default)]
    pub first_source_id: u32,
    #[serde(default = "default_slow_cutoff")]
    pub slow_cutoff: f64,
    #[serde(default = "default_fast_cutoff")]
    pub fast_cutoff: f64,
    #[serde(default)]
    pub seed: Option<[u32; 4]>,
    pub sources: Vec<SourceConfig>,
    #[serde(default)]
    pub updates: Vec<UpdateConfig>,
}

#[derive(Deserialize, Serialize)]
pub struct SourceConfig {
    /// Rate in Hz.
    pub rate: f64,
    #[serde(default)]
    pub start: u32,
    #[serde(default = "default_end")]
    pub end: u32,
}

/// A rate change delivered before `tick` runs.
#[derive(Deserialize, Serialize)]
pub struct UpdateConfig {
    pub tick: u32,
    pub id: u32,
    pub rate: f64,
}

impl Population {
    /// Builds the parameter block a host would load into the node.
    pub fn block(&self) -> ParameterBlock {
        assert!(self.ticks_per_second > 0, "ticks_per_second must be positive");
        let globals = GlobalParameters {
            key: self.key,
            mask: self.mask,
            timer_offset: 0,
            time_between_spikes: self.time_between_spikes,
            seconds_per_tick: UFract::from_f64(1.0 / f64::from(self.ticks_per_second)),
            ticks_per_second: self.ticks_per_second,
            slow_cutoff: Accum::from_f64(self.slow_cutoff),
            fast_cutoff: Accum::from_f64(self.fast_cutoff),
            first_source_id: self.first_source_id,
            n_sources: self.sources.len() as u32,
            seed: self.seed.unwrap_or(Kiss64::DEFAULT_SEED),
        };

        // Slow phases drawn here are replaced when the node initializes
        let map = RateMap::from(&globals);
        let mut rng = Kiss64::default();
        let sources = self
            .sources
            .iter()
            .map(|source| Source {
                start: source.start,
                end: source.end,
                regime: map.regime(Accum::from_f64(source.rate), &mut rng),
            })
            .collect();
        ParameterBlock { globals, sources }
    }

    /// Returns the scheduled updates grouped by tick, in tick order.
    pub fn schedule(&self) -> Vec<(u32, Vec<RateUpdate>)> {
        let mut updates = self
            .updates
            .iter()
            .map(|update| {
                (
                    update.tick,
                    RateUpdate {
                        id: update.id,
                        rate: Accum::from_f64(update.rate),
                    },
                )
            })
            .collect::<Vec<_>>();
        updates.sort_by_key(|(tick, _)| *tick);

        let mut schedule: Vec<(u32, Vec<RateUpdate>)> = Vec::new();
        for (tick, update) in updates {
            match schedule.last_mut() {
                Some((last, group)) if *last == tick => group.push(update),
                _ => schedule.push((tick, vec![update])),
            }
        }
        schedule
    }
}

/// Encodes a group of updates as a batch payload.
pub fn batch(updates: &[RateUpdate]) -> bytes::Bytes {
    updates.to_vec().encode().freeze()
}
