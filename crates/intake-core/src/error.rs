//! Error types for intake-core.
//!
//! # Error Recovery Strategies
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::Rejected`] | Quarantine, do not retry | Input is malformed; retrying reads the same bytes |
//! | [`Error::EmptyBatch`] | Do not retry | Nothing to aggregate |
//! | [`Error::PersistenceFailure`] | Retry with backoff | Database may be briefly unavailable |
//! | [`Error::RelocationConflict`] | Retry, then leave for an operator | A same-named file blocks the move |
//! | [`Error::TransientIo`] | Retry with backoff | Filesystem hiccup |
//!
//! Validation faults never reach the retry loop as errors: the validator
//! converts them into a quarantine and reports a successful outcome. See
//! [`crate::validation::Validator::validate_and_transform`].

use std::path::{Path, PathBuf};

use intake_types::Rejection;
use thiserror::Error;

/// Errors raised by the intake pipeline.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The file failed validation.
    #[error("Validation failed: {0}")]
    Rejected(#[from] Rejection),

    /// Aggregation was asked to summarize a batch with no readings.
    #[error("Cannot aggregate an empty batch")]
    EmptyBatch,

    /// The persistence gateway could not commit the batch.
    #[error("Persistence failed: {0}")]
    PersistenceFailure(String),

    /// A file with the same name already exists at the destination.
    #[error("Relocation conflict: {} already exists", path.display())]
    RelocationConflict {
        /// The occupied destination.
        path: PathBuf,
    },

    /// A filesystem operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    TransientIo {
        /// The path being accessed.
        path: PathBuf,
        /// The underlying error.
        source: std::io::Error,
    },

    /// A path has no usable file name component.
    #[error("Path has no file name: {}", .0.display())]
    InvalidPath(PathBuf),
}

impl Error {
    /// Create an I/O error with path context.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::TransientIo {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Create a persistence failure from any displayable cause.
    pub fn persistence(cause: impl std::fmt::Display) -> Self {
        Self::PersistenceFailure(cause.to_string())
    }

    /// Whether retrying the same work could plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Rejected(_) | Error::EmptyBatch | Error::InvalidPath(_) => false,
            Error::PersistenceFailure(_)
            | Error::RelocationConflict { .. }
            | Error::TransientIo { .. } => true,
        }
    }
}

/// Result type alias using intake-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
