//! Error types for intake-store.

use std::path::PathBuf;

/// Result type for intake-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in intake-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A stored timestamp is outside the representable range.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<Error> for intake_core::Error {
    fn from(err: Error) -> Self {
        intake_core::Error::persistence(err)
    }
}
