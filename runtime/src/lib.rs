//! Interact with the hardware and memory surrounding a simulation node.
//!
//! An engine running on a node touches three collaborators:
//! - A free-running cycle counter ([Clock]) used to pace outbound packets.
//! - A slower bulk store ([Store]) holding named regions (parameters,
//!   provenance) and accepting asynchronous recording writes.
//! - The interconnect ([Fabric]) accepting key-only packets.
//!
//! The [deterministic] module provides implementations whose behavior is fully
//! controlled by the caller (for tests and simulation). The [system] module
//! provides a clock backed by the host's monotonic timer.

use bytes::Bytes;
use futures::channel::oneshot;
use std::fmt;
use thiserror::Error;

pub mod deterministic;
pub mod storage;
pub mod system;

/// Errors that can occur when interacting with the runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("region missing: {0}")]
    RegionMissing(Region),
    #[error("region {region} too small: {len} > {capacity}")]
    RegionTooSmall {
        region: Region,
        len: usize,
        capacity: usize,
    },
}

/// Named regions of the bulk store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Region {
    /// Global run parameters followed by the source table.
    Parameters,
    /// Diagnostic counters written when a run pauses.
    Provenance,
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Region::Parameters => write!(f, "parameters"),
            Region::Provenance => write!(f, "provenance"),
        }
    }
}

/// Interface to the node's free-running cycle counter.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Returns the current cycle count.
    fn cycles(&self) -> u64;

    /// Busy-waits for at least `cycles`.
    fn delay(&self, cycles: u64);
}

/// Interface to the bulk store.
///
/// Region reads and writes are synchronous: an `Ok` result means the transfer
/// was issued and its content is visible to the next read. Recording writes
/// are asynchronous: the returned receiver resolves once the store no longer
/// needs the caller's buffer.
pub trait Store: Clone + Send + Sync + 'static {
    /// Read the full content of a region.
    fn read(&self, region: Region) -> Result<Bytes, Error>;

    /// Overwrite a region from offset zero.
    fn write(&self, region: Region, data: Bytes) -> Result<(), Error>;

    /// Append a record to a recording channel.
    fn record(&self, channel: u8, data: Bytes) -> Result<oneshot::Receiver<()>, Error>;
}

/// Interface to the interconnect.
pub trait Fabric: Clone + Send + 'static {
    /// Attempt to enqueue a key-only packet.
    ///
    /// Returns `false` if the outbound queue is momentarily full.
    fn try_send(&self, key: u32) -> bool;
}
