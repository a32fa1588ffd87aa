//! Core pipeline stages for sensor file intake.
//!
//! This crate turns a raw intake file into data ready for storage, and sets
//! aside files that cannot be trusted.
//!
//! # Stages
//!
//! - **Validation**: parse delimited text, enforce field ranges across the
//!   whole file, z-score normalize temperature and pressure
//!   ([`validation`])
//! - **Quarantine**: move rejected files aside with a reason file
//!   ([`quarantine`])
//! - **Aggregation**: min/max/mean/std per field ([`metrics`])
//! - **Persistence**: the [`PersistenceGateway`] boundary ([`traits`])
//! - **Retry**: bounded exponential backoff around a unit of work ([`retry`])
//!
//! # Quick Start
//!
//! ```no_run
//! use intake_core::{QuarantineManager, Validator, metrics};
//! use intake_core::validation::ValidationOutcome;
//!
//! let validator = Validator::default();
//! let quarantine = QuarantineManager::new("quarantine");
//!
//! match validator.validate_and_transform("data/readings.csv".as_ref(), &quarantine)? {
//!     ValidationOutcome::Accepted(batch) => {
//!         let metrics = metrics::aggregate(&batch)?;
//!         println!("{} readings, {} metrics", batch.len(), metrics.len());
//!     }
//!     ValidationOutcome::Quarantined(record) => {
//!         println!("quarantined: {}", record.reason);
//!     }
//! }
//! # Ok::<(), intake_core::Error>(())
//! ```

pub mod error;
pub mod metrics;
pub mod quarantine;
pub mod relocate;
pub mod retry;
pub mod traits;
pub mod validation;

pub use intake_types::types;

pub use error::{Error, Result};
pub use quarantine::{QuarantineManager, REASON_SUFFIX};
pub use retry::{RetryPolicy, with_retry};
pub use traits::{PersistSummary, PersistenceGateway};
pub use validation::{ValidationOutcome, Validator, ValidatorConfig, Verdict};
