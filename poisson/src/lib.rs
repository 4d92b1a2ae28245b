//! Generate Poisson spike trains for a population of sources.
//!
//! # Overview
//!
//! Every tick, each active source draws the number of events it fires. Which
//! draw is used depends on the source's per-tick rate (its regime):
//! - Slow: exponentially distributed gaps, tracked with a phase countdown in
//!   thousandths of a tick.
//! - Fast: a Poisson count from `exp(-lambda)`.
//! - Faster: a rounded Gaussian approximation, `(z / 2 + sqrt(lambda))^2`.
//!
//! Events are recorded in per-tick bitmaps (flushed asynchronously to the
//! store) and, if the node has a routing key, paced onto the interconnect.
//!
//! The [Engine] owns all state and runs one tick at a time. The [Driver]
//! serves it from a [Mailbox], ordering inbound rate updates ahead of ticks.
//!
//! # Pause and resume
//!
//! When a finite run length is reached the engine persists its parameter
//! block (global parameters including the live generator state, followed by
//! every source descriptor), writes a [Provenance] record, waits for the
//! outstanding recording write and reverts the tick counter. After
//! [Engine::resume] the interrupted tick runs exactly once.
//!
//! # Example
//!
//! ```rust
//! use futures::executor::block_on;
//! use neurocore_codec::{Encode, FixedSize};
//! use neurocore_math::{Accum, Kiss64, UFract};
//! use neurocore_poisson::{
//!     params::{GlobalParameters, ParameterBlock, Regime, Source},
//!     Config, Engine, Provenance, RunLength, Step,
//! };
//! use neurocore_runtime::{deterministic, storage::memory, Region};
//! use prometheus_client::registry::Registry;
//!
//! let block = ParameterBlock {
//!     globals: GlobalParameters {
//!         key: None,
//!         mask: u32::MAX,
//!         timer_offset: 0,
//!         time_between_spikes: 0,
//!         seconds_per_tick: UFract::from_f64(0.001),
//!         ticks_per_second: 1000,
//!         slow_cutoff: Accum::ONE,
//!         fast_cutoff: Accum::from_int(10),
//!         first_source_id: 0,
//!         n_sources: 1,
//!         seed: Kiss64::DEFAULT_SEED,
//!     },
//!     sources: vec![Source {
//!         start: 0,
//!         end: u32::MAX,
//!         regime: Regime::Faster { sqrt_lambda: Accum::from_int(4) },
//!     }],
//! };
//! let store = memory::Store::new();
//! store.allocate(Region::Parameters, block.encode().to_vec());
//! store.allocate_zeroed(Region::Provenance, Provenance::SIZE);
//!
//! let clock = deterministic::Clock::default();
//! let fabric = deterministic::Fabric::new(clock.clone());
//! let cfg = Config {
//!     recording: true,
//!     run_length: RunLength::Ticks(1),
//!     cycles_per_tick: 1000,
//!     recording_channel: 0,
//! };
//! let mut engine = Engine::init(cfg, clock, store.clone(), fabric, &mut Registry::default()).unwrap();
//! assert!(matches!(block_on(engine.tick()).unwrap(), Step::Processed { time: 0, .. }));
//! assert_eq!(block_on(engine.tick()).unwrap(), Step::Suspended { resume_at: 1 });
//! assert_eq!(store.records(0).len(), 1);
//! ```

mod config;
pub use config::{Config, RunLength};
mod driver;
pub use driver::Driver;
mod engine;
pub use engine::{Engine, State, Step};
mod error;
pub use error::Error;
pub mod generate;
mod ingress;
pub use ingress::{Mailbox, Message, Multicast};
mod metrics;
pub use metrics::Metrics;
mod pacer;
pub use pacer::Pacer;
pub mod params;
mod provenance;
pub use provenance::Provenance;
pub mod rates;
pub use rates::RateUpdate;
pub mod recording;
pub use recording::{Record, Recording};
pub mod sources;
