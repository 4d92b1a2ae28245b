use crate::{
    generate,
    params::{GlobalParameters, ParameterBlock},
    rates::{self, RateUpdate},
    sources::SourceTable,
    Config, Error, Metrics, Pacer, Provenance, Recording, RunLength,
};
use bytes::Buf;
use neurocore_codec::{Encode, ReadExt};
use neurocore_math::{Accum, Kiss64};
use neurocore_runtime::{Clock, Fabric, Region, Store};
use prometheus_client::registry::Registry;
use tracing::{debug, error, info, trace};

/// Lifecycle of the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Running,
    Pausing,
    Paused,
}

/// Outcome of a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// The tick was processed.
    Processed { time: u32, spikes: u32 },
    /// The run length was reached: state was persisted and the engine is
    /// ready to suspend. Tick `resume_at` runs after the next resume.
    Suspended { resume_at: u32 },
    /// A tick arrived while paused and was dropped.
    Idle,
}

/// Generates, records and transmits the events of every owned source.
pub struct Engine<C: Clock, S: Store, F: Fabric> {
    ////////////////////////////////////////
    // Interfaces
    ////////////////////////////////////////
    store: S,
    pacer: Pacer<C, F>,

    ////////////////////////////////////////
    // State
    ////////////////////////////////////////
    state: State,
    run_length: RunLength,

    /// Tick being processed (starts one before zero).
    time: u32,

    globals: GlobalParameters,
    table: SourceTable,
    rng: Kiss64,

    /// `None` if recording is disabled.
    recording: Option<Recording>,

    ////////////////////////////////////////
    // Metrics
    ////////////////////////////////////////
    metrics: Metrics,
}

impl<C: Clock, S: Store, F: Fabric> Engine<C, S, F> {
    /// Loads the parameter block from `store` and prepares to run.
    ///
    /// Every slow source starts from a freshly drawn phase.
    pub fn init(
        cfg: Config,
        clock: C,
        store: S,
        fabric: F,
        registry: &mut Registry,
    ) -> Result<Self, Error> {
        let ParameterBlock {
            mut globals,
            sources,
        } = load(&store)?;

        let mut rng = Kiss64::from_seed(globals.seed);
        let mut table = SourceTable::new(&globals, sources);
        table.draw_phases(&mut rng);
        globals.seed = rng.state();
        let metrics = Metrics::init(registry);
        let pacer = Pacer::new(
            clock,
            fabric,
            u64::from(globals.time_between_spikes),
            cfg.cycles_per_tick,
            metrics.pacing_overruns.clone(),
            metrics.fabric_retries.clone(),
        );
        let recording = cfg
            .recording
            .then(|| Recording::new(cfg.recording_channel, table.len()));
        info!(
            sources = table.len(),
            first = globals.first_source_id,
            key = ?globals.key,
            recording = recording.is_some(),
            run_length = ?cfg.run_length,
            "initialized"
        );

        Ok(Self {
            store,
            pacer,
            state: State::Running,
            run_length: cfg.run_length,
            time: u32::MAX,
            globals,
            table,
            rng,
            recording,
            metrics,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Last tick processed (or `u32::MAX` before the first).
    pub fn time(&self) -> u32 {
        self.time
    }

    pub fn globals(&self) -> &GlobalParameters {
        &self.globals
    }

    pub fn table(&self) -> &SourceTable {
        &self.table
    }

    /// Current generator state.
    pub fn seed(&self) -> [u32; 4] {
        self.rng.state()
    }

    pub fn recording(&self) -> Option<&Recording> {
        self.recording.as_ref()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Runs one tick.
    pub async fn tick(&mut self) -> Result<Step, Error> {
        if self.state != State::Running {
            return Err(Error::NotRunning);
        }
        self.time = self.time.wrapping_add(1);
        if let RunLength::Ticks(ticks) = self.run_length {
            if self.time >= ticks {
                self.pause().await?;
                return Ok(Step::Suspended {
                    resume_at: self.time.wrapping_add(1),
                });
            }
        }

        let time = self.time;
        let mut spikes = 0u32;
        self.pacer.start_tick();
        for (index, source) in self.table.sources_mut().iter_mut().enumerate() {
            if !source.is_active(time) {
                continue;
            }
            let count = generate::events(&mut source.regime, &mut self.rng);
            if count == 0 {
                continue;
            }
            if let Some(recording) = &mut self.recording {
                recording.mark(index, count)?;
            }
            if let Some(key) = self.globals.key {
                for _ in 0..count {
                    self.pacer.emit(key | index as u32);
                }
            }
            spikes = spikes.saturating_add(count);
        }
        self.metrics.ticks.inc();
        self.metrics.spikes.inc_by(u64::from(spikes));

        if let Some(recording) = &mut self.recording {
            if recording.flush(&self.store, time).await? {
                self.metrics.flushes.inc();
            }
            self.metrics.sub_buffers.set(recording.allocated() as i64);
        }
        debug!(time, spikes, "processed tick");
        Ok(Step::Processed { time, spikes })
    }

    /// Persists state, drains the outstanding recording write and reverts the
    /// tick counter so the interrupted tick runs again after resume.
    async fn pause(&mut self) -> Result<(), Error> {
        self.state = State::Pausing;
        debug!(time = self.time, "pausing");

        self.globals.seed = self.rng.state();
        let block = ParameterBlock {
            globals: self.globals.clone(),
            sources: self.table.sources().to_vec(),
        };
        if let Err(err) = self.store.write(Region::Parameters, block.encode().freeze()) {
            error!(?err, "failed to persist parameters");
            return Err(Error::ParametersWrite(err));
        }
        let provenance = Provenance::from(&self.metrics);
        self.store
            .write(Region::Provenance, provenance.encode().freeze())?;
        if let Some(recording) = &mut self.recording {
            recording.wait().await?;
        }

        self.time = self.time.wrapping_sub(1);
        self.state = State::Paused;
        info!(time = self.time, ?provenance, "paused");
        Ok(())
    }

    /// Reloads the source table from the store and continues with a new run length.
    ///
    /// Global parameters and the generator keep their in-memory values.
    pub fn resume(&mut self, run_length: RunLength) -> Result<(), Error> {
        if self.state != State::Paused {
            return Err(Error::NotPaused);
        }
        if let Some(recording) = &mut self.recording {
            recording.reset();
        }
        let block = load(&self.store)?;
        if let Err(err) = self.table.replace(block.sources) {
            error!(?err, "failed to reload sources");
            return Err(err);
        }
        self.table.redraw_zero_phases(&mut self.rng);
        self.run_length = run_length;
        self.state = State::Running;
        info!(time = self.time, ?run_length, "resumed");
        Ok(())
    }

    /// Sets the rate (in Hz) of source `id`. Returns `false` if the source is not owned.
    pub fn set_rate(&mut self, id: u32, rate: Accum) -> bool {
        let applied = self.table.set_rate(id, rate, &mut self.rng);
        if applied {
            self.metrics.rates_applied.inc();
        } else {
            self.metrics.rates_ignored.inc();
        }
        applied
    }

    /// Applies a rate carried by a multicast packet.
    pub fn multicast(&mut self, key: u32, payload: u32) -> bool {
        let RateUpdate { id, rate } = RateUpdate::from_multicast(key, payload, self.globals.mask);
        self.set_rate(id, rate)
    }

    /// Applies a batch of rates. Returns the number applied.
    pub fn batch(&mut self, payload: impl Buf) -> usize {
        let updates = match rates::decode_batch(payload) {
            Ok(updates) => updates,
            Err(err) => {
                trace!(?err, "ignoring malformed rate batch");
                self.metrics.rates_ignored.inc();
                return 0;
            }
        };
        updates
            .into_iter()
            .filter(|update| self.set_rate(update.id, update.rate))
            .count()
    }
}

/// Reads and decodes the parameter block.
fn load<S: Store>(store: &S) -> Result<ParameterBlock, Error> {
    let mut region = match store.read(Region::Parameters) {
        Ok(region) => region,
        Err(err) => {
            error!(?err, "failed to read parameters");
            return Err(Error::ParametersRead(err));
        }
    };
    match ParameterBlock::read(&mut region) {
        Ok(block) => Ok(block),
        Err(err) => {
            error!(?err, "invalid parameters");
            Err(err.into())
        }
    }
}
