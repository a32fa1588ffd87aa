//! Validation and normalization of intake files.
//!
//! An intake file is delimited text with a header row and at least the
//! columns `date`, `T`, `rh` and `p`. Every row must satisfy every
//! constraint or the whole file is rejected:
//!
//! - `date` parses as a timestamp (see [`parse_timestamp`])
//! - `T`, `rh` and `p` are present, finite, and inside their [`Range`]
//!
//! Constraints are checked column by column (timestamps first, then fields in
//! [`Field::ALL`] order), so the reported rejection is deterministic.
//!
//! An accepted batch has its normalized fields (temperature and pressure by
//! default) replaced by z-scores computed over that same batch.
//!
//! # Example
//!
//! ```
//! use intake_core::validation::{Validator, Verdict};
//!
//! let csv = "date,T,rh,p\n2024-01-01,25,50,1013\n2024-01-02,30,55,1015\n";
//! let verdict = Validator::default().validate_reader("readings.csv", csv.as_bytes())?;
//! let Verdict::Accepted(batch) = verdict else { panic!("rejected") };
//! assert_eq!(batch.len(), 2);
//! # Ok::<(), intake_core::Error>(())
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use intake_types::{Field, QuarantineRecord, Reading, ReadingBatch, Rejection};
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::metrics::FieldStats;
use crate::quarantine::QuarantineManager;
use crate::relocate;

/// Header of the timestamp column.
pub const DATE_COLUMN: &str = "date";

const DATETIME_FORMATS: &[&[BorrowedFormatItem<'static>]] = &[
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day] [hour]:[minute]"),
    format_description!("[day].[month].[year] [hour]:[minute]:[second]"),
];

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse a `date` cell.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS[.fff]`, `YYYY-MM-DDTHH:MM:SS[.fff]`,
/// `YYYY-MM-DD HH:MM`, `DD.MM.YYYY HH:MM:SS` and a bare `YYYY-MM-DD`.
/// Values without an offset are taken as UTC.
///
/// ```
/// use intake_core::validation::parse_timestamp;
///
/// assert!(parse_timestamp("2024-01-01").is_some());
/// assert!(parse_timestamp("01.01.2024 10:20:00").is_some());
/// assert!(parse_timestamp("not a date").is_none());
/// ```
pub fn parse_timestamp(value: &str) -> Option<OffsetDateTime> {
    let value = value.trim();

    if let Ok(ts) = OffsetDateTime::parse(value, &Rfc3339) {
        return Some(ts);
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = PrimitiveDateTime::parse(value, *format) {
            return Some(dt.assume_utc());
        }
    }

    Date::parse(value, DATE_FORMAT)
        .ok()
        .map(|d| d.midnight().assume_utc())
}

/// Allowed interval for a field's values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
    /// Whether the bounds themselves are allowed.
    pub inclusive: bool,
}

impl Range {
    /// `[min, max]`
    pub const fn inclusive(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            inclusive: true,
        }
    }

    /// `(min, max)`
    pub const fn exclusive(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            inclusive: false,
        }
    }

    /// Whether `value` lies inside the range.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        if self.inclusive {
            value >= self.min && value <= self.max
        } else {
            value > self.min && value < self.max
        }
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.inclusive {
            write!(f, "[{}, {}]", self.min, self.max)
        } else {
            write!(f, "({}, {})", self.min, self.max)
        }
    }
}

/// Configuration for file validation.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Allowed temperature (°C).
    pub temperature: Range,
    /// Allowed relative humidity (%).
    pub humidity: Range,
    /// Allowed pressure (hPa).
    pub pressure: Range,
    /// Fields replaced by their batch z-scores on acceptance.
    pub normalize: Vec<Field>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            temperature: Range::inclusive(-50.0, 50.0),
            humidity: Range::inclusive(0.0, 100.0),
            pressure: Range::exclusive(900.0, 1100.0),
            normalize: vec![Field::Temperature, Field::Pressure],
        }
    }
}

impl ValidatorConfig {
    /// The allowed range for a field.
    #[must_use]
    pub fn range(&self, field: Field) -> Range {
        match field {
            Field::Temperature => self.temperature,
            Field::Humidity => self.humidity,
            Field::Pressure => self.pressure,
        }
    }
}

/// Outcome of checking a file without side effects.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Every row passed; the batch is normalized and stamped.
    Accepted(ReadingBatch),
    /// At least one constraint failed.
    Rejected(Rejection),
}

/// Outcome of [`Validator::validate_and_transform`].
#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    /// The file is valid and ready for aggregation.
    Accepted(ReadingBatch),
    /// The file was rejected and has been moved to quarantine.
    Quarantined(QuarantineRecord),
}

impl ValidationOutcome {
    /// The accepted batch, or `None` if the file was quarantined.
    pub fn into_batch(self) -> Option<ReadingBatch> {
        match self {
            ValidationOutcome::Accepted(batch) => Some(batch),
            ValidationOutcome::Quarantined(_) => None,
        }
    }
}

/// Parses, checks and normalizes intake files.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
}

impl Validator {
    /// Create a validator with custom configuration.
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// The validator's configuration.
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a file, quarantining it on rejection.
    ///
    /// Rejections are not errors: they come back as
    /// [`ValidationOutcome::Quarantined`]. An `Err` means the file could not
    /// be read, or could not be moved to quarantine.
    pub fn validate_and_transform(
        &self,
        path: &Path,
        quarantine: &QuarantineManager,
    ) -> Result<ValidationOutcome> {
        match self.validate_file(path)? {
            Verdict::Accepted(batch) => {
                debug!(
                    "Validated {} ({} readings)",
                    batch.source_file_name,
                    batch.len()
                );
                Ok(ValidationOutcome::Accepted(batch))
            }
            Verdict::Rejected(rejection) => {
                warn!("Validation failed for {}: {}", path.display(), rejection);
                let record = quarantine.quarantine(path, &rejection.to_string())?;
                Ok(ValidationOutcome::Quarantined(record))
            }
        }
    }

    /// Validate a file without moving it anywhere.
    pub fn validate_file(&self, path: &Path) -> Result<Verdict> {
        let source_name = relocate::file_name(path)?;
        let file = File::open(path).map_err(|e| Error::io(path, e))?;
        self.validate_reader(&source_name, file)
    }

    /// Validate delimited text from any reader.
    ///
    /// `source_name` becomes the batch's `source_file_name`.
    pub fn validate_reader<R: Read>(&self, source_name: &str, reader: R) -> Result<Verdict> {
        match self.parse(source_name, reader) {
            Ok(batch) => Ok(Verdict::Accepted(batch)),
            Err(Error::Rejected(rejection)) => Ok(Verdict::Rejected(rejection)),
            Err(e) => Err(e),
        }
    }

    fn parse<R: Read>(&self, source_name: &str, reader: R) -> Result<ReadingBatch> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = csv
            .headers()
            .map_err(|e| csv_failure(source_name, e))?
            .clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| Rejection::MissingColumn(name.to_string()))
        };

        let date_idx = column(DATE_COLUMN)?;
        let mut field_idx = Vec::with_capacity(Field::ALL.len());
        for field in Field::ALL {
            field_idx.push((field, column(field.column())?));
        }

        let records = csv
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| csv_failure(source_name, e))?;

        if records.is_empty() {
            return Err(Rejection::EmptyBatch.into());
        }

        let timestamps = records
            .iter()
            .enumerate()
            .map(|(i, record)| {
                let raw = record.get(date_idx).unwrap_or_default();
                parse_timestamp(raw).ok_or_else(|| Rejection::InvalidTimestamp {
                    row: i + 1,
                    value: raw.to_string(),
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut values: BTreeMap<Field, Vec<f64>> = BTreeMap::new();
        for &(field, idx) in &field_idx {
            let range = self.config.range(field);
            let column = records
                .iter()
                .enumerate()
                .map(|(i, record)| check_value(field, range, i + 1, record.get(idx)))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            values.insert(field, column);
        }

        let passthrough: Vec<(usize, &str)> = headers
            .iter()
            .enumerate()
            .filter(|&(idx, _)| idx != date_idx && field_idx.iter().all(|&(_, f)| f != idx))
            .collect();

        let readings = records
            .iter()
            .zip(timestamps)
            .enumerate()
            .map(|(i, (record, timestamp))| Reading {
                timestamp,
                temperature: values[&Field::Temperature][i],
                relative_humidity: values[&Field::Humidity][i],
                pressure: values[&Field::Pressure][i],
                extra: passthrough
                    .iter()
                    .map(|&(idx, name)| {
                        (
                            name.to_string(),
                            record.get(idx).unwrap_or_default().to_string(),
                        )
                    })
                    .collect(),
            })
            .collect();

        let mut batch = ReadingBatch::new(source_name, readings);
        normalize(&mut batch, &self.config.normalize);
        Ok(batch)
    }
}

/// Replace `fields` in every reading by their z-score over the batch.
///
/// Uses the batch's own mean and sample standard deviation. A field with zero
/// or undefined spread (one row, or all values equal) normalizes to `0.0`.
pub fn normalize(batch: &mut ReadingBatch, fields: &[Field]) {
    for &field in fields {
        let values: Vec<f64> = batch.values(field).collect();
        let Some(stats) = FieldStats::compute(&values) else {
            continue;
        };

        for reading in &mut batch.readings {
            let value = field.value_mut(reading);
            *value = if stats.std > 0.0 && stats.std.is_finite() {
                (*value - stats.mean) / stats.std
            } else {
                0.0
            };
        }
    }
}

fn check_value(
    field: Field,
    range: Range,
    row: usize,
    raw: Option<&str>,
) -> std::result::Result<f64, Rejection> {
    let raw = raw.unwrap_or_default();
    if raw.is_empty() {
        return Err(Rejection::MissingValue { field, row });
    }

    let value = raw
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Rejection::InvalidValue {
            field,
            row,
            value: raw.to_string(),
        })?;

    if !range.contains(value) {
        return Err(Rejection::OutOfRangeValue { field, row, value });
    }

    Ok(value)
}

fn csv_failure(source_name: &str, err: csv::Error) -> Error {
    let message = err.to_string();
    match err.into_kind() {
        csv::ErrorKind::Io(e) => Error::io(source_name, e),
        _ => Rejection::Malformed(message).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use time::macros::datetime;

    fn validate(csv: &str) -> Verdict {
        Validator::default()
            .validate_reader("test.csv", csv.as_bytes())
            .unwrap()
    }

    fn rejected(csv: &str) -> Rejection {
        match validate(csv) {
            Verdict::Rejected(r) => r,
            Verdict::Accepted(b) => panic!("expected rejection, got {:?}", b),
        }
    }

    fn accepted(csv: &str) -> ReadingBatch {
        match validate(csv) {
            Verdict::Accepted(b) => b,
            Verdict::Rejected(r) => panic!("expected acceptance, got {}", r),
        }
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            parse_timestamp("2024-01-01"),
            Some(datetime!(2024-01-01 00:00 UTC))
        );
        assert_eq!(
            parse_timestamp("2024-01-01 12:30:15"),
            Some(datetime!(2024-01-01 12:30:15 UTC))
        );
        assert_eq!(
            parse_timestamp("2024-01-01T12:30:15"),
            Some(datetime!(2024-01-01 12:30:15 UTC))
        );
        assert_eq!(
            parse_timestamp("2024-01-01 12:30"),
            Some(datetime!(2024-01-01 12:30 UTC))
        );
        assert_eq!(
            parse_timestamp("01.02.2024 00:10:00"),
            Some(datetime!(2024-02-01 00:10 UTC))
        );
        assert_eq!(
            parse_timestamp("2024-01-01T12:00:00+02:00"),
            Some(datetime!(2024-01-01 10:00 UTC))
        );
        assert_eq!(parse_timestamp("2024-13-01"), None);
        assert_eq!(parse_timestamp(""), None);
    }

    #[test]
    fn test_range_bounds() {
        let inc = Range::inclusive(0.0, 100.0);
        assert!(inc.contains(0.0));
        assert!(inc.contains(100.0));
        assert!(!inc.contains(100.1));

        let exc = Range::exclusive(900.0, 1100.0);
        assert!(!exc.contains(900.0));
        assert!(!exc.contains(1100.0));
        assert!(exc.contains(900.5));
        assert_eq!(exc.to_string(), "(900, 1100)");
    }

    #[test]
    fn test_two_row_file_is_accepted_and_normalized() {
        let batch =
            accepted("date,T,rh,p\n2024-01-01,25,50,1013\n2024-01-02,30,55,1015\n");
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.source_file_name, "test.csv");

        // Two values: z-scores are -1/sqrt(2) and +1/sqrt(2)
        let half = std::f64::consts::FRAC_1_SQRT_2;
        assert!((batch.readings[0].temperature + half).abs() < 1e-9);
        assert!((batch.readings[1].temperature - half).abs() < 1e-9);
        assert!((batch.readings[0].pressure + half).abs() < 1e-9);

        // Humidity untouched
        assert_eq!(batch.readings[0].relative_humidity, 50.0);
        assert_eq!(batch.readings[1].relative_humidity, 55.0);
        assert_eq!(batch.readings[0].timestamp, datetime!(2024-01-01 00:00 UTC));
    }

    #[test]
    fn test_pressure_below_range_is_rejected() {
        let r = rejected("date,T,rh,p\n2024-01-01,25,50,1013\n2024-01-02,20,50,850\n");
        assert_eq!(
            r,
            Rejection::OutOfRangeValue {
                field: Field::Pressure,
                row: 2,
                value: 850.0
            }
        );
        assert!(r.to_string().contains("pressure"));
    }

    #[test]
    fn test_pressure_bounds_are_exclusive() {
        let r = rejected("date,T,rh,p\n2024-01-01,25,50,1100\n");
        assert_eq!(r.field(), Some(Field::Pressure));
    }

    #[test]
    fn test_temperature_and_humidity_bounds_are_inclusive() {
        accepted("date,T,rh,p\n2024-01-01,-50,0,901\n2024-01-02,50,100,1099\n");
        let r = rejected("date,T,rh,p\n2024-01-01,50.5,10,1000\n");
        assert_eq!(r.field(), Some(Field::Temperature));
        let r = rejected("date,T,rh,p\n2024-01-01,20,-1,1000\n");
        assert_eq!(r.field(), Some(Field::Humidity));
    }

    #[test]
    fn test_invalid_timestamp_is_rejected() {
        let r = rejected("date,T,rh,p\n2024-01-01,25,50,1013\nnot-a-date,25,50,1013\n");
        assert_eq!(
            r,
            Rejection::InvalidTimestamp {
                row: 2,
                value: "not-a-date".to_string()
            }
        );
    }

    #[test]
    fn test_timestamps_are_checked_before_ranges() {
        let r = rejected("date,T,rh,p\nbad,99,50,1013\n");
        assert!(matches!(r, Rejection::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_missing_and_invalid_values() {
        let r = rejected("date,T,rh,p\n2024-01-01,,50,1013\n");
        assert_eq!(
            r,
            Rejection::MissingValue {
                field: Field::Temperature,
                row: 1
            }
        );

        let r = rejected("date,T,rh,p\n2024-01-01,20,wet,1013\n");
        assert!(matches!(
            r,
            Rejection::InvalidValue {
                field: Field::Humidity,
                ..
            }
        ));

        let r = rejected("date,T,rh,p\n2024-01-01,NaN,50,1013\n");
        assert!(matches!(r, Rejection::InvalidValue { .. }));
    }

    #[test]
    fn test_missing_column() {
        let r = rejected("date,T,rh\n2024-01-01,20,50\n");
        assert_eq!(r, Rejection::MissingColumn("p".to_string()));
    }

    #[test]
    fn test_header_only_file_is_empty_batch() {
        assert_eq!(rejected("date,T,rh,p\n"), Rejection::EmptyBatch);
    }

    #[test]
    fn test_ragged_rows_are_malformed() {
        let r = rejected("date,T,rh,p\n2024-01-01,20,50\n");
        assert!(matches!(r, Rejection::Malformed(_)));
    }

    #[test]
    fn test_extra_columns_pass_through() {
        let batch = accepted(
            "station, date ,T,rh,p,wv\nA,2024-01-01,20,50,1000,1.5\nB,2024-01-02,21,51,1001,2.0\n",
        );
        assert_eq!(batch.readings[0].extra["station"], "A");
        assert_eq!(batch.readings[1].extra["wv"], "2.0");
        assert_eq!(batch.readings[0].extra.len(), 2);
    }

    #[test]
    fn test_single_row_normalizes_to_zero() {
        let batch = accepted("date,T,rh,p\n2024-01-01,20,50,1000\n");
        assert_eq!(batch.readings[0].temperature, 0.0);
        assert_eq!(batch.readings[0].pressure, 0.0);
        assert_eq!(batch.readings[0].relative_humidity, 50.0);
    }

    #[test]
    fn test_validate_and_transform_quarantines() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("bad.csv");
        std::fs::write(&path, "date,T,rh,p\n2024-01-01,20,50,850\n").unwrap();
        let quarantine = QuarantineManager::new(tmp.path().join("quarantine"));

        let outcome = Validator::default()
            .validate_and_transform(&path, &quarantine)
            .unwrap();

        let ValidationOutcome::Quarantined(record) = outcome else {
            panic!("expected quarantine");
        };
        assert!(!path.exists());
        assert!(record.quarantined_path.exists());
        let reason = std::fs::read_to_string(&record.reason_path).unwrap();
        assert!(reason.contains("pressure"));
    }

    #[test]
    fn test_validate_and_transform_accepts_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("good.csv");
        std::fs::write(&path, "date,T,rh,p\n2024-01-01,20,50,1000\n").unwrap();
        let quarantine = QuarantineManager::new(tmp.path().join("quarantine"));

        let outcome = Validator::default()
            .validate_and_transform(&path, &quarantine)
            .unwrap();

        let batch = outcome.into_batch().unwrap();
        assert_eq!(batch.source_file_name, "good.csv");
        assert!(path.exists());
    }

    #[test]
    fn test_missing_file_is_an_error_not_a_rejection() {
        let tmp = tempfile::tempdir().unwrap();
        let err = Validator::default()
            .validate_file(&tmp.path().join("absent.csv"))
            .unwrap_err();
        assert!(matches!(err, Error::TransientIo { .. }));
    }

    fn valid_rows() -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
        prop::collection::vec((-50.0..=50.0f64, 0.0..=100.0f64, 900.5..1099.5f64), 2..50)
    }

    fn to_csv(rows: &[(f64, f64, f64)]) -> String {
        let mut csv = String::from("date,T,rh,p\n");
        for (i, (t, rh, p)) in rows.iter().enumerate() {
            csv.push_str(&format!("2024-01-01 00:{:02}:00,{t},{rh},{p}\n", i % 60));
        }
        csv
    }

    proptest! {
        #[test]
        fn prop_valid_batches_normalize(rows in valid_rows()) {
            let batch = accepted(&to_csv(&rows));
            prop_assert_eq!(batch.len(), rows.len());

            for field in [Field::Temperature, Field::Pressure] {
                let values: Vec<f64> = batch.values(field).collect();
                let stats = FieldStats::compute(&values).unwrap();
                prop_assert!(stats.mean.abs() < 1e-6, "{field} mean {}", stats.mean);
                // Constant columns normalize to all zeros
                prop_assert!(
                    (stats.std - 1.0).abs() < 1e-6 || stats.std == 0.0,
                    "{field} std {}", stats.std
                );
            }

            let rh: Vec<f64> = batch.values(Field::Humidity).collect();
            let original: Vec<f64> = rows.iter().map(|r| r.1).collect();
            prop_assert_eq!(rh, original);
        }

        #[test]
        fn prop_one_bad_row_rejects_the_file(
            rows in valid_rows(),
            bad_row in 0usize..50,
            bad_pressure in 0.0..900.0f64,
        ) {
            let mut rows = rows;
            let idx = bad_row % rows.len();
            rows[idx].2 = bad_pressure;
            let r = rejected(&to_csv(&rows));
            prop_assert_eq!(r.field(), Some(Field::Pressure));
        }
    }
}
