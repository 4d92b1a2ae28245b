//! Run a simulated population of Poisson spike sources.
//!
//! The population (tick rate, routing key, per-source rates and scheduled rate
//! changes) is read from a YAML file. The node runs against a deterministic
//! clock, store and interconnect, so the same file always produces the same
//! spike trains.
//!
//! # Usage
//!
//! ```sh
//! cargo run --release --bin neurocore-node -- demos/node/population.yaml --ticks 2000 --pause-every 500
//! ```
//!
//! With `--pause-every`, the node suspends periodically: it persists its
//! parameters and provenance, and is then resumed from the persisted sources.
//! With `--realtime`, events are paced against the host's monotonic clock
//! (one cycle per nanosecond) instead of the deterministic one.

mod population;

use clap::{value_parser, Arg, ArgAction, Command};
use futures::{executor::block_on, future::join};
use neurocore_codec::{Decode, DecodeExt, Encode, FixedSize};
use neurocore_poisson::{
    Config, Driver, Engine, Error, Provenance, RateUpdate, Record, RunLength, Step,
};
use neurocore_runtime::{deterministic, storage::memory, system, Clock, Region};
use population::Population;
use prometheus_client::{encoding::text::encode, registry::Registry};
use std::str::FromStr;
use tracing::{info, warn, Level};

/// Store channel receiving recording records.
const RECORDING_CHANNEL: u8 = 0;

/// Cycles in one tick.
const CYCLES_PER_TICK: u64 = 200_000;

/// What the client delivers to the driver.
struct Plan {
    schedule: Vec<(u32, Vec<RateUpdate>)>,
    ticks: u32,
    pause_every: Option<u32>,
    mailbox_size: usize,
}

/// Runs the engine on `clock` until its final pause.
fn run<C: Clock>(
    cfg: Config,
    clock: C,
    store: memory::Store,
    fabric: deterministic::Fabric,
    registry: &mut Registry,
    plan: Plan,
) {
    let Plan {
        schedule,
        ticks,
        pause_every,
        mailbox_size,
    } = plan;
    let engine =
        Engine::init(cfg, clock, store, fabric, registry).expect("Could not initialize engine");
    let (driver, mut mailbox) = Driver::new(engine, mailbox_size);

    // Deliver scheduled updates and ticks until the final pause
    let client = async move {
        let mut schedule = schedule.into_iter().peekable();
        let mut time = 0u32;
        let mut delivered = None;
        loop {
            if delivered != Some(time) {
                while let Some((_, updates)) = schedule.next_if(|(tick, _)| *tick <= time) {
                    match updates.as_slice() {
                        [update] => {
                            mailbox
                                .multicast(update.id, update.rate.to_bits() as u32)
                                .await?;
                        }
                        updates => mailbox.batch(population::batch(updates)).await?,
                    }
                }
                delivered = Some(time);
            }

            let step = mailbox.tick().await?.await.map_err(|_| Error::Closed)?;
            match step {
                Step::Processed { time: processed, .. } => time = processed.wrapping_add(1),
                Step::Suspended { resume_at } => {
                    info!(resume_at, "suspended");
                    if resume_at >= ticks {
                        break;
                    }
                    let next = pause_every.map_or(ticks, |every| {
                        resume_at.saturating_add(every).min(ticks)
                    });
                    mailbox
                        .resume(RunLength::Ticks(next))
                        .await?
                        .await
                        .map_err(|_| Error::Closed)?;
                }
                Step::Idle => warn!(time, "tick dropped"),
            }
        }
        Ok::<_, Error>(())
    };
    let (engine, client) = block_on(join(driver.run(), client));
    engine.expect("Engine failed");
    client.expect("Client failed");
}

fn main() {
    // Parse arguments
    let matches = Command::new("neurocore-node")
        .about("generate Poisson spike trains for a simulated population")
        .arg(Arg::new("population").required(true))
        .arg(
            Arg::new("ticks")
                .long("ticks")
                .required(false)
                .default_value("1000")
                .value_parser(value_parser!(u32))
                .help("Number of ticks to run"),
        )
        .arg(
            Arg::new("pause-every")
                .long("pause-every")
                .required(false)
                .value_parser(value_parser!(u32).range(1..))
                .help("Suspend and resume after this many ticks"),
        )
        .arg(
            Arg::new("mailbox-size")
                .long("mailbox-size")
                .required(false)
                .default_value("64")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("realtime")
                .long("realtime")
                .action(ArgAction::SetTrue)
                .help("Pace events with the host clock"),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .required(false)
                .default_value("info"),
        )
        .get_matches();

    // Create logger
    let level = matches.get_one::<String>("log-level").unwrap();
    let level = Level::from_str(level).expect("Invalid log level");
    tracing_subscriber::fmt().with_max_level(level).init();

    // Load population
    let population_file = matches.get_one::<String>("population").unwrap();
    let population_file =
        std::fs::read_to_string(population_file).expect("Could not read population file");
    let population: Population =
        serde_yaml::from_str(&population_file).expect("Could not parse population file");
    let block = population.block();
    let schedule = population.schedule();
    let n_sources = block.sources.len();
    info!(
        sources = n_sources,
        key = ?block.globals.key,
        updates = schedule.len(),
        "loaded population"
    );

    // Load parameters into the store
    let store = memory::Store::new();
    store.allocate(Region::Parameters, block.encode().to_vec());
    store.allocate_zeroed(Region::Provenance, Provenance::SIZE);

    // Initialize engine
    let ticks = *matches.get_one::<u32>("ticks").unwrap();
    let pause_every = matches.get_one::<u32>("pause-every").copied();
    let mailbox_size = *matches.get_one::<usize>("mailbox-size").unwrap();
    let first_pause = pause_every.map_or(ticks, |every| every.min(ticks));
    let clock = deterministic::Clock::default();
    let fabric = deterministic::Fabric::new(clock.clone());
    let mut registry = Registry::with_prefix("poisson");
    let cfg = Config {
        recording: true,
        run_length: RunLength::Ticks(first_pause),
        cycles_per_tick: CYCLES_PER_TICK,
        recording_channel: RECORDING_CHANNEL,
    };
    let plan = Plan {
        schedule,
        ticks,
        pause_every,
        mailbox_size,
    };
    if matches.get_flag("realtime") {
        // Send times are still stamped by the deterministic clock
        info!("pacing with the host clock");
        let clock = system::Clock::new();
        run(cfg, clock, store.clone(), fabric.clone(), &mut registry, plan);
    } else {
        run(cfg, clock, store.clone(), fabric.clone(), &mut registry, plan);
    }

    // Summarize recorded spikes
    let mut spikes = vec![0u64; n_sources];
    let records = store.records(RECORDING_CHANNEL);
    for record in &records {
        let record = Record::decode_cfg(record.clone(), &n_sources).expect("Invalid record");
        for (index, count) in spikes.iter_mut().enumerate() {
            *count += u64::from(record.events(index));
        }
    }
    let seconds = f64::from(ticks) / f64::from(population.ticks_per_second);
    for (index, count) in spikes.iter().enumerate() {
        let id = block.globals.first_source_id + index as u32;
        let rate = if seconds > 0.0 {
            *count as f64 / seconds
        } else {
            0.0
        };
        info!(id, spikes = count, rate = %format!("{rate:.2}"), "source");
    }
    let provenance = store
        .region(Region::Provenance)
        .expect("Provenance region missing");
    let provenance = Provenance::decode(&provenance[..]).expect("Invalid provenance");
    info!(
        records = records.len(),
        sent = fabric.sent().len(),
        rejected = fabric.rejected(),
        ?provenance,
        "finished"
    );

    // Print metrics
    let mut buffer = String::new();
    encode(&mut buffer, &registry).expect("Could not encode metrics");
    println!("{buffer}");
}
