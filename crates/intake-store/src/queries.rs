//! Query builders for persisted readings and metrics.
//!
//! Both [`ReadingQuery`] and [`MetricQuery`] follow the builder pattern; every
//! filter is optional.
//!
//! # Example
//!
//! ```
//! use intake_store::{Store, ReadingQuery, MetricQuery};
//!
//! let dir = tempfile::tempdir()?;
//! let store = Store::open(dir.path().join("readings.db"))?;
//!
//! // Readings of one file in source order
//! let query = ReadingQuery::new()
//!     .file("2024-01-01.csv")
//!     .oldest_first()
//!     .limit(50);
//! let readings = store.query_readings(&query)?;
//!
//! // Temperature metrics across all files
//! let metrics = store.query_metrics(&MetricQuery::new().sensor_type("T"))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use time::OffsetDateTime;
use uuid::Uuid;

type Params = Vec<Box<dyn rusqlite::ToSql>>;

/// Fluent query builder for raw reading rows.
///
/// By default, results are ordered by reading `date` descending (newest
/// first), with rows of equal date in insertion order.
#[derive(Debug, Default, Clone)]
pub struct ReadingQuery {
    /// Filter by source file name.
    pub file_name: Option<String>,
    /// Filter by batch.
    pub batch_id: Option<Uuid>,
    /// Readings taken at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Readings taken at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by date descending (newest first).
    pub newest_first: bool,
}

impl ReadingQuery {
    /// Create a new query with default settings.
    ///
    /// Default behavior:
    /// - No file or batch filter
    /// - No time range filter
    /// - No limit (all matching rows)
    /// - Ordered by newest first
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Only include readings from the given source file.
    pub fn file(mut self, file_name: &str) -> Self {
        self.file_name = Some(file_name.to_string());
        self
    }

    /// Only include readings from the given batch.
    pub fn batch(mut self, batch_id: Uuid) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    /// Filter to readings taken at or after this time.
    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    /// Filter to readings taken at or before this time.
    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results chronologically.
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Params) {
        let mut conditions = Vec::new();
        let mut params: Params = Vec::new();

        if let Some(ref file_name) = self.file_name {
            conditions.push("file_name = ?");
            params.push(Box::new(file_name.clone()));
        }

        if let Some(batch_id) = self.batch_id {
            conditions.push("batch_id = ?");
            params.push(Box::new(batch_id.to_string()));
        }

        if let Some(since) = self.since {
            conditions.push("date >= ?");
            params.push(Box::new(since.unix_timestamp()));
        }

        if let Some(until) = self.until {
            conditions.push("date <= ?");
            params.push(Box::new(until.unix_timestamp()));
        }

        (where_clause(&conditions), params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT id, batch_id, date, temperature, relative_humidity, pressure, \
             extra, file_name, processed_at \
             FROM raw_sensor_data {} ORDER BY date {}, id ASC",
            where_clause, order
        );
        push_paging(&mut sql, self.limit, self.offset);
        sql
    }
}

/// Fluent query builder for aggregate metric rows.
///
/// Results are ordered by insertion, so the metrics of one batch come back in
/// their fixed field order.
#[derive(Debug, Default, Clone)]
pub struct MetricQuery {
    /// Filter by source file name.
    pub file_name: Option<String>,
    /// Filter by batch.
    pub batch_id: Option<Uuid>,
    /// Filter by sensor type (`T`, `rh` or `p`).
    pub sensor_type: Option<String>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
}

impl MetricQuery {
    /// Create a new query matching every metric row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only include metrics of the given source file.
    pub fn file(mut self, file_name: &str) -> Self {
        self.file_name = Some(file_name.to_string());
        self
    }

    /// Only include metrics of the given batch.
    pub fn batch(mut self, batch_id: Uuid) -> Self {
        self.batch_id = Some(batch_id);
        self
    }

    /// Only include metrics of one sensor type.
    pub fn sensor_type(mut self, sensor_type: &str) -> Self {
        self.sensor_type = Some(sensor_type.to_string());
        self
    }

    /// Limit the maximum number of results returned.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip the first N results.
    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub(crate) fn build_where(&self) -> (String, Params) {
        let mut conditions = Vec::new();
        let mut params: Params = Vec::new();

        if let Some(ref file_name) = self.file_name {
            conditions.push("file_name = ?");
            params.push(Box::new(file_name.clone()));
        }

        if let Some(batch_id) = self.batch_id {
            conditions.push("batch_id = ?");
            params.push(Box::new(batch_id.to_string()));
        }

        if let Some(ref sensor_type) = self.sensor_type {
            conditions.push("sensor_type = ?");
            params.push(Box::new(sensor_type.clone()));
        }

        (where_clause(&conditions), params)
    }

    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let mut sql = format!(
            "SELECT id, batch_id, sensor_type, min, max, mean, std, file_name, \
             timestamp, processed_at \
             FROM aggregated_metrics {} ORDER BY id ASC",
            where_clause
        );
        push_paging(&mut sql, self.limit, self.offset);
        sql
    }
}

fn where_clause(conditions: &[&str]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    }
}

fn push_paging(sql: &mut String, limit: Option<u32>, offset: Option<u32>) {
    match (limit, offset) {
        (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
        (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
        // SQLite requires a LIMIT before OFFSET
        (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
        (None, None) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_reading_query_new_defaults() {
        let query = ReadingQuery::new();
        assert!(query.file_name.is_none());
        assert!(query.batch_id.is_none());
        assert!(query.since.is_none());
        assert!(query.until.is_none());
        assert!(query.limit.is_none());
        assert!(query.offset.is_none());
        assert!(query.newest_first);
    }

    #[test]
    fn test_reading_query_chaining() {
        let since = datetime!(2024-01-01 00:00:00 UTC);
        let until = datetime!(2024-12-31 23:59:59 UTC);

        let query = ReadingQuery::new()
            .file("a.csv")
            .since(since)
            .until(until)
            .limit(10)
            .offset(5)
            .oldest_first();

        assert_eq!(query.file_name, Some("a.csv".to_string()));
        assert_eq!(query.since, Some(since));
        assert_eq!(query.until, Some(until));
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(5));
        assert!(!query.newest_first);
    }

    #[test]
    fn test_reading_query_sql() {
        let query = ReadingQuery::new()
            .file("a.csv")
            .since(datetime!(2024-01-01 00:00:00 UTC))
            .limit(10);
        let (where_clause, params) = query.build_where();
        assert_eq!(where_clause, "WHERE file_name = ? AND date >= ?");
        assert_eq!(params.len(), 2);

        let sql = query.build_sql();
        assert!(sql.contains("FROM raw_sensor_data WHERE"));
        assert!(sql.contains("ORDER BY date DESC"));
        assert!(sql.ends_with("LIMIT 10"));
    }

    #[test]
    fn test_offset_without_limit() {
        let sql = MetricQuery::new().offset(3).build_sql();
        assert!(sql.ends_with("LIMIT -1 OFFSET 3"));
    }

    #[test]
    fn test_metric_query_sql() {
        let query = MetricQuery::new().file("a.csv").sensor_type("p");
        let (where_clause, params) = query.build_where();
        assert_eq!(where_clause, "WHERE file_name = ? AND sensor_type = ?");
        assert_eq!(params.len(), 2);
        assert!(query.build_sql().contains("ORDER BY id ASC"));
    }
}
