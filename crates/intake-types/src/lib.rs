//! Domain types for the sensor file intake pipeline.
//!
//! This crate holds the data that flows between pipeline stages and carries
//! no I/O of its own:
//!
//! - [`Reading`] and [`ReadingBatch`] for parsed file contents
//! - [`AggregateMetric`] for per-field batch statistics
//! - [`Rejection`] for structured validation failures
//! - [`QuarantineRecord`] for files set aside with a reason
//!
//! # Example
//!
//! ```
//! use intake_types::{Field, Rejection};
//!
//! let rejection = Rejection::OutOfRangeValue { field: Field::Pressure, row: 1, value: 850.0 };
//! assert!(rejection.to_string().contains("pressure"));
//! ```

pub mod error;
pub mod types;

pub use error::Rejection;
pub use types::{AggregateMetric, Field, QuarantineRecord, Reading, ReadingBatch};
