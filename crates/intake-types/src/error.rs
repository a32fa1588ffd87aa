//! Rejection reasons for intake files.

use thiserror::Error;

use crate::types::Field;

/// Why a file was rejected by validation.
///
/// The `Display` output is the human-readable reason written next to a
/// quarantined file. Row numbers are 1-based data rows (the header is not
/// counted).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new rejection
/// reasons without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum Rejection {
    /// A `date` cell could not be parsed.
    #[error("Invalid timestamp in row {row}: {value:?}")]
    InvalidTimestamp { row: usize, value: String },

    /// A value lies outside its field's allowed range.
    #[error("{field} value {value} in row {row} is out of range")]
    OutOfRangeValue { field: Field, row: usize, value: f64 },

    /// A monitored cell is empty.
    #[error("Missing {field} value in row {row}")]
    MissingValue { field: Field, row: usize },

    /// A monitored cell is not a finite number.
    #[error("Invalid {field} value in row {row}: {value:?}")]
    InvalidValue {
        field: Field,
        row: usize,
        value: String,
    },

    /// A required column is absent from the header.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// The file is not readable as delimited text.
    #[error("Malformed input: {0}")]
    Malformed(String),

    /// The file has a header but no data rows.
    #[error("File contains no readings")]
    EmptyBatch,
}

impl Rejection {
    /// The field a rejection refers to, if any.
    #[must_use]
    pub fn field(&self) -> Option<Field> {
        match self {
            Rejection::OutOfRangeValue { field, .. }
            | Rejection::MissingValue { field, .. }
            | Rejection::InvalidValue { field, .. } => Some(*field),
            _ => None,
        }
    }
}
