//! Error types for catalog access.

use thiserror::Error;

/// Errors that can occur when fetching the catalog from its source.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Source is offline or unreachable
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// Failed to parse the catalog documents
    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// IO error while reading the catalog
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, FetchError>;
