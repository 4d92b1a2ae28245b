use thiserror::Error;

/// Errors that halt the engine.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to allocate {0} recording sub-buffers")]
    AllocationFailed(usize),
    #[error("failed to read parameters: {0}")]
    ParametersRead(#[source] neurocore_runtime::Error),
    #[error("failed to write parameters: {0}")]
    ParametersWrite(#[source] neurocore_runtime::Error),
    #[error("recording write on channel {0} was dropped")]
    RecordingFailed(u8),
    #[error("invalid parameters: {0}")]
    InvalidParameters(#[from] neurocore_codec::Error),
    #[error("source count changed: expected {expected}, found {found}")]
    SourceCountMismatch { expected: usize, found: usize },
    #[error("store error: {0}")]
    Store(#[from] neurocore_runtime::Error),
    #[error("engine not running")]
    NotRunning,
    #[error("engine not paused")]
    NotPaused,
    #[error("driver stopped")]
    Closed,
}
