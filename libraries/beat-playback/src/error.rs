//! Error types for playback management

use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// Queue has no next/previous candidate
    #[error("Queue is empty")]
    QueueEmpty,

    /// Command not valid in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Device could not prepare a resource
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Device rejected a transport command
    #[error("Device error: {0}")]
    Device(String),

    /// Coordinator task is no longer running
    #[error("Playback coordinator closed")]
    CoordinatorClosed,
}

/// Device load failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    /// Resource could not be opened or decoded
    #[error("Cannot load {locator}: {reason}")]
    Unavailable { locator: String, reason: String },

    /// Device failed while preparing
    #[error("Device failed during load: {0}")]
    Device(String),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
