//! Per-field summary statistics over a reading batch.
//!
//! [`aggregate`] is a pure reduction: the same batch always yields the same
//! metrics, in [`Field::ALL`] order.

use intake_types::{AggregateMetric, Field, ReadingBatch};

use crate::error::{Error, Result};

/// Summary statistics over a sequence of values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldStats {
    /// Number of values.
    pub count: usize,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator), 0.0 when `count < 2`.
    pub std: f64,
}

impl FieldStats {
    /// Compute statistics over `values`. Returns `None` if there are none.
    pub fn compute(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &v in values {
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }

        let mean = sum / count as f64;
        let std = if count < 2 {
            0.0
        } else {
            let sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
            (sq / (count - 1) as f64).sqrt()
        };

        // Rounding can push the mean a hair outside [min, max] for near-constant input.
        let mean = if mean < min {
            min
        } else if mean > max {
            max
        } else {
            mean
        };

        Some(Self {
            count,
            min,
            max,
            mean,
            std,
        })
    }
}

/// Reduce a batch to one [`AggregateMetric`] per monitored field.
///
/// Fails with [`Error::EmptyBatch`] if the batch has no readings.
pub fn aggregate(batch: &ReadingBatch) -> Result<Vec<AggregateMetric>> {
    let timestamp = batch.earliest_timestamp().ok_or(Error::EmptyBatch)?;

    Field::ALL
        .into_iter()
        .map(|field| {
            let values: Vec<f64> = batch.values(field).collect();
            let stats = FieldStats::compute(&values).ok_or(Error::EmptyBatch)?;
            Ok(AggregateMetric {
                field,
                min: stats.min,
                max: stats.max,
                mean: stats.mean,
                std: stats.std,
                source_file_name: batch.source_file_name.clone(),
                timestamp,
                processed_at: batch.processed_at,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use intake_types::Reading;
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use time::macros::datetime;

    fn batch(rows: &[(f64, f64, f64)]) -> ReadingBatch {
        let readings = rows
            .iter()
            .enumerate()
            .map(|(i, &(t, rh, p))| Reading {
                timestamp: datetime!(2024-01-01 00:00 UTC) + time::Duration::hours(i as i64),
                temperature: t,
                relative_humidity: rh,
                pressure: p,
                extra: BTreeMap::new(),
            })
            .collect();
        ReadingBatch::new("test.csv", readings)
    }

    #[test]
    fn test_stats_basic() {
        let stats = FieldStats::compute(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.count, 8);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert_eq!(stats.mean, 5.0);
        // Sample variance = 32 / 7
        assert!((stats.std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_stats_single_value() {
        let stats = FieldStats::compute(&[42.0]).unwrap();
        assert_eq!(stats.mean, 42.0);
        assert_eq!(stats.std, 0.0);
    }

    #[test]
    fn test_stats_empty() {
        assert!(FieldStats::compute(&[]).is_none());
    }

    #[test]
    fn test_aggregate_field_order_and_provenance() {
        let b = batch(&[(25.0, 50.0, 1013.0), (30.0, 55.0, 1015.0)]);
        let metrics = aggregate(&b).unwrap();

        let fields: Vec<Field> = metrics.iter().map(|m| m.field).collect();
        assert_eq!(fields, Field::ALL.to_vec());

        let rh = &metrics[1];
        assert_eq!(rh.min, 50.0);
        assert_eq!(rh.max, 55.0);
        assert_eq!(rh.mean, 52.5);
        assert_eq!(rh.source_file_name, "test.csv");
        assert_eq!(rh.timestamp, datetime!(2024-01-01 00:00 UTC));
        assert_eq!(rh.processed_at, b.processed_at);
    }

    #[test]
    fn test_aggregate_empty_batch() {
        let b = batch(&[]);
        assert!(matches!(aggregate(&b), Err(Error::EmptyBatch)));
    }

    fn rows() -> impl Strategy<Value = Vec<(f64, f64, f64)>> {
        prop::collection::vec((-50.0..=50.0f64, 0.0..=100.0f64, 900.1..1099.9f64), 1..40)
    }

    proptest! {
        #[test]
        fn prop_mean_between_min_and_max(rows in rows()) {
            let metrics = aggregate(&batch(&rows)).unwrap();
            for m in &metrics {
                prop_assert!(m.min <= m.mean && m.mean <= m.max, "{:?}", m);
                prop_assert!(m.std >= 0.0);
            }
        }

        #[test]
        fn prop_aggregate_is_deterministic(rows in rows()) {
            let b = batch(&rows);
            prop_assert_eq!(aggregate(&b).unwrap(), aggregate(&b).unwrap());
        }
    }
}
