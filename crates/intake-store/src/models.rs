//! Data models for stored rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use intake_types::Field;

/// A reading row in `raw_sensor_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredReading {
    /// Database row ID.
    pub id: i64,
    /// Batch the row belongs to.
    pub batch_id: Uuid,
    /// When the reading was taken.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// Temperature (z-score).
    pub temperature: f64,
    /// Relative humidity in percent.
    pub relative_humidity: f64,
    /// Pressure (z-score).
    pub pressure: f64,
    /// Pass-through columns.
    pub extra: BTreeMap<String, String>,
    /// Source file name.
    pub file_name: String,
    /// When the batch was processed.
    #[serde(with = "time::serde::rfc3339")]
    pub processed_at: OffsetDateTime,
}

/// A metric row in `aggregated_metrics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMetric {
    /// Database row ID.
    pub id: i64,
    /// Batch the row belongs to.
    pub batch_id: Uuid,
    /// Column name of the summarized field (`T`, `rh` or `p`).
    pub sensor_type: String,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation.
    pub std: f64,
    /// Source file name.
    pub file_name: String,
    /// Earliest reading timestamp of the batch.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// When the batch was processed.
    #[serde(with = "time::serde::rfc3339")]
    pub processed_at: OffsetDateTime,
}

impl StoredMetric {
    /// The summarized field, if `sensor_type` is one we know.
    pub fn field(&self) -> Option<Field> {
        Field::from_column(&self.sensor_type)
    }
}
