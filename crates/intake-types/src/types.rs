//! Core types for sensor intake data.

use core::fmt;
use std::collections::BTreeMap;
use std::path::PathBuf;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// A monitored sensor field.
///
/// Every batch is checked and aggregated over these fields, always in the
/// order given by [`Field::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Field {
    /// Air temperature in °C.
    Temperature,
    /// Relative humidity in percent.
    Humidity,
    /// Barometric pressure in hPa.
    Pressure,
}

impl Field {
    /// All monitored fields in their fixed order.
    pub const ALL: [Field; 3] = [Field::Temperature, Field::Humidity, Field::Pressure];

    /// Column header of this field in intake files.
    ///
    /// The same name is written as `sensor_type` in the aggregates relation.
    ///
    /// # Examples
    ///
    /// ```
    /// use intake_types::Field;
    ///
    /// assert_eq!(Field::Temperature.column(), "T");
    /// assert_eq!(Field::Humidity.column(), "rh");
    /// assert_eq!(Field::Pressure.column(), "p");
    /// ```
    #[must_use]
    pub fn column(&self) -> &'static str {
        match self {
            Field::Temperature => "T",
            Field::Humidity => "rh",
            Field::Pressure => "p",
        }
    }

    /// Human-readable name used in log lines and rejection reasons.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Field::Temperature => "temperature",
            Field::Humidity => "relative humidity",
            Field::Pressure => "pressure",
        }
    }

    /// Look up a field by its column header.
    #[must_use]
    pub fn from_column(column: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == column)
    }

    /// Read this field's value out of a reading.
    #[must_use]
    pub fn value(&self, reading: &Reading) -> f64 {
        match self {
            Field::Temperature => reading.temperature,
            Field::Humidity => reading.relative_humidity,
            Field::Pressure => reading.pressure,
        }
    }

    /// Mutable access to this field's value in a reading.
    pub fn value_mut<'a>(&self, reading: &'a mut Reading) -> &'a mut f64 {
        match self {
            Field::Temperature => &mut reading.temperature,
            Field::Humidity => &mut reading.relative_humidity,
            Field::Pressure => &mut reading.pressure,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row of sensor data taken from an intake file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// When the reading was taken (the `date` column).
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    /// Temperature (`T`). Z-score normalized once the batch is accepted.
    pub temperature: f64,
    /// Relative humidity (`rh`). Never normalized.
    pub relative_humidity: f64,
    /// Pressure (`p`). Z-score normalized once the batch is accepted.
    pub pressure: f64,
    /// Columns that are not part of the monitored set, passed through as-is.
    #[cfg_attr(feature = "serde", serde(default))]
    pub extra: BTreeMap<String, String>,
}

/// An ordered sequence of readings from a single file.
///
/// A batch is validated, aggregated and persisted as a unit. Row order is the
/// order of the source file.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReadingBatch {
    /// Identifier shared by the batch's reading rows and metric rows.
    pub batch_id: Uuid,
    /// Base name of the file the batch came from.
    pub source_file_name: String,
    /// When the batch was transformed.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub processed_at: OffsetDateTime,
    /// Readings in source order.
    pub readings: Vec<Reading>,
}

impl ReadingBatch {
    /// Create a batch stamped with a fresh id and the current time.
    pub fn new(source_file_name: impl Into<String>, readings: Vec<Reading>) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            source_file_name: source_file_name.into(),
            processed_at: OffsetDateTime::now_utc(),
            readings,
        }
    }

    /// Number of readings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.readings.len()
    }

    /// Whether the batch holds no readings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Earliest reading timestamp, used as the aggregates' data timestamp.
    #[must_use]
    pub fn earliest_timestamp(&self) -> Option<OffsetDateTime> {
        self.readings.iter().map(|r| r.timestamp).min()
    }

    /// Values of one field in source order.
    pub fn values(&self, field: Field) -> impl Iterator<Item = f64> + '_ {
        self.readings.iter().map(move |r| field.value(r))
    }
}

/// Summary statistics of one monitored field over one batch.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AggregateMetric {
    /// The summarized field.
    pub field: Field,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (0.0 for a single-row batch).
    pub std: f64,
    /// Source file of the batch.
    pub source_file_name: String,
    /// Earliest reading timestamp in the batch.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    /// When the batch was processed.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub processed_at: OffsetDateTime,
}

/// A rejected file and the reason it was set aside.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct QuarantineRecord {
    /// Base name of the rejected file.
    pub file_name: String,
    /// Where the file now lives.
    pub quarantined_path: PathBuf,
    /// Companion file holding the reason.
    pub reason_path: PathBuf,
    /// Human-readable rejection reason.
    pub reason: String,
    /// When the file was quarantined.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub quarantined_at: OffsetDateTime,
}
