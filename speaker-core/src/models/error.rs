use thiserror::Error;

/// Errors surfaced by the engine, its backends, and terminal streamers.
///
/// Initialization failures name the stage that failed. End-of-stream is not
/// an error: a streamer that ends cleanly reports `more == false` and
/// `err() == None`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StreamError {
    #[error("device enumeration failed: {0}")]
    DeviceEnumeration(String),

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to open device: {0}")]
    DeviceOpen(String),

    #[error("failed to start device: {0}")]
    DeviceStart(String),

    #[error("configuration failed: {0}")]
    Configuration(String),

    #[error("engine not initialized")]
    NotInitialized,

    #[error("stream error: {0}")]
    Stream(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StreamError>;
