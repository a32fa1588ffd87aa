//! SQLite persistence for validated sensor readings.
//!
//! Accepted batches land in two tables: `raw_sensor_data` holds one row per
//! reading, `aggregated_metrics` holds one min/max/mean/std row per field.
//! Both tables carry the batch id, the source file name and the processing
//! time so every metric can be traced back to the readings it summarizes.
//!
//! [`Store`] implements [`intake_core::PersistenceGateway`]: a batch and its
//! metrics are written in a single transaction on a connection opened for
//! that call alone.
//!
//! # Example
//!
//! ```no_run
//! use intake_store::{Store, MetricQuery};
//!
//! let store = Store::open_default()?;
//!
//! let metrics = store.query_metrics(&MetricQuery::new().file("2024-01-01.csv"))?;
//! for metric in metrics {
//!     println!("{}: {} .. {}", metric.sensor_type, metric.min, metric.max);
//! }
//! # Ok::<(), intake_store::Error>(())
//! ```

mod error;
mod models;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use models::{StoredMetric, StoredReading};
pub use queries::{MetricQuery, ReadingQuery};
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/sensor-intake/readings.db`
/// - macOS: `~/Library/Application Support/sensor-intake/readings.db`
/// - Windows: `C:\Users\<user>\AppData\Local\sensor-intake\readings.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("sensor-intake")
        .join("readings.db")
}
