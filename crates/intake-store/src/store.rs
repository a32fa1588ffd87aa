//! Main store implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use intake_core::{PersistSummary, PersistenceGateway};
use intake_types::{AggregateMetric, ReadingBatch};

use crate::error::{Error, Result};
use crate::models::{StoredMetric, StoredReading};
use crate::queries::{MetricQuery, ReadingQuery};
use crate::schema;

/// SQLite-based store for validated batches.
///
/// The store keeps only the database path. Each operation opens its own
/// connection and closes it before returning, on success and on failure.
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        info!("Opening database at {}", path.display());
        let store = Self {
            path: path.to_path_buf(),
        };

        let conn = store.connect()?;
        schema::initialize(&conn)?;

        Ok(store)
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA busy_timeout = 5000;",
        )?;
        Ok(conn)
    }

    /// Insert a batch's readings and then its metrics in one transaction.
    ///
    /// If any insert fails the transaction is rolled back when it goes out of
    /// scope and nothing from the batch is visible.
    pub fn insert_batch(
        &self,
        batch: &ReadingBatch,
        metrics: &[AggregateMetric],
    ) -> Result<PersistSummary> {
        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let batch_id = batch.batch_id.to_string();
        let processed_at = batch.processed_at.unix_timestamp();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO raw_sensor_data (batch_id, date, temperature, relative_humidity,
                 pressure, extra, file_name, processed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for reading in &batch.readings {
                stmt.execute(rusqlite::params![
                    batch_id,
                    reading.timestamp.unix_timestamp(),
                    reading.temperature,
                    reading.relative_humidity,
                    reading.pressure,
                    serde_json::to_string(&reading.extra)?,
                    batch.source_file_name,
                    processed_at,
                ])?;
            }
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO aggregated_metrics (batch_id, sensor_type, min, max, mean, std,
                 file_name, timestamp, processed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for metric in metrics {
                stmt.execute(rusqlite::params![
                    batch_id,
                    metric.field.column(),
                    metric.min,
                    metric.max,
                    metric.mean,
                    metric.std,
                    metric.source_file_name,
                    metric.timestamp.unix_timestamp(),
                    metric.processed_at.unix_timestamp(),
                ])?;
            }
        }

        tx.commit()?;

        info!(
            "Stored {} readings and {} metrics from {}",
            batch.len(),
            metrics.len(),
            batch.source_file_name
        );

        Ok(PersistSummary {
            readings: batch.len(),
            metrics: metrics.len(),
        })
    }
}

#[async_trait]
impl PersistenceGateway for Store {
    async fn persist(
        &self,
        batch: &ReadingBatch,
        metrics: &[AggregateMetric],
    ) -> intake_core::Result<PersistSummary> {
        Ok(self.insert_batch(batch, metrics)?)
    }
}

// Reading operations
impl Store {
    /// Query readings with filters.
    pub fn query_readings(&self, query: &ReadingQuery) -> Result<Vec<StoredReading>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let readings = stmt
            .query_map(params_ref.as_slice(), |row| {
                let extra: String = row.get(6)?;
                Ok(StoredReading {
                    id: row.get(0)?,
                    batch_id: uuid_at(row, 1)?,
                    date: timestamp_at(row, 2)?,
                    temperature: row.get(3)?,
                    relative_humidity: row.get(4)?,
                    pressure: row.get(5)?,
                    extra: serde_json::from_str(&extra).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(6, Type::Text, Box::new(e))
                    })?,
                    file_name: row.get(7)?,
                    processed_at: timestamp_at(row, 8)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// Count readings, optionally for one source file.
    pub fn count_readings(&self, file_name: Option<&str>) -> Result<u64> {
        self.count("raw_sensor_data", file_name)
    }
}

// Metric operations
impl Store {
    /// Query metrics with filters.
    pub fn query_metrics(&self, query: &MetricQuery) -> Result<Vec<StoredMetric>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let conn = self.connect()?;
        let mut stmt = conn.prepare(&sql)?;
        let metrics = stmt
            .query_map(params_ref.as_slice(), |row| {
                Ok(StoredMetric {
                    id: row.get(0)?,
                    batch_id: uuid_at(row, 1)?,
                    sensor_type: row.get(2)?,
                    min: row.get(3)?,
                    max: row.get(4)?,
                    mean: row.get(5)?,
                    std: row.get(6)?,
                    file_name: row.get(7)?,
                    timestamp: timestamp_at(row, 8)?,
                    processed_at: timestamp_at(row, 9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(metrics)
    }

    /// Count metric rows, optionally for one source file.
    pub fn count_metrics(&self, file_name: Option<&str>) -> Result<u64> {
        self.count("aggregated_metrics", file_name)
    }

    fn count(&self, table: &str, file_name: Option<&str>) -> Result<u64> {
        let conn = self.connect()?;
        let count: i64 = match file_name {
            Some(name) => conn.query_row(
                &format!("SELECT COUNT(*) FROM {} WHERE file_name = ?", table),
                [name],
                |row| row.get(0),
            )?,
            None => conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?,
        };

        Ok(count as u64)
    }
}

fn timestamp_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<OffsetDateTime> {
    let secs: i64 = row.get(idx)?;
    OffsetDateTime::from_unix_timestamp(secs).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Integer,
            Box::new(Error::InvalidTimestamp(secs)),
        )
    })
}

fn uuid_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
