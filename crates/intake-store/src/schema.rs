//! Database schema and migrations.

use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

/// Initialize the database schema.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == 0 {
        create_schema_v1(conn)?;
        set_schema_version(conn, SCHEMA_VERSION)?;
    } else if version < SCHEMA_VERSION {
        migrate(conn, version)?;
    }

    Ok(())
}

/// Get the current schema version.
fn get_schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 =
        conn.query_row("SELECT version FROM schema_version", [], |row| row.get(0))?;

    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

/// Create the initial schema (version 1).
fn create_schema_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- One row per reading of an accepted file
        CREATE TABLE IF NOT EXISTS raw_sensor_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL,
            date INTEGER NOT NULL,
            temperature REAL NOT NULL,
            relative_humidity REAL NOT NULL,
            pressure REAL NOT NULL,
            extra TEXT NOT NULL DEFAULT '{}',
            file_name TEXT NOT NULL,
            processed_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_raw_sensor_data_file
            ON raw_sensor_data(file_name, date);
        CREATE INDEX IF NOT EXISTS idx_raw_sensor_data_batch
            ON raw_sensor_data(batch_id);

        -- One row per monitored field per accepted file
        CREATE TABLE IF NOT EXISTS aggregated_metrics (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            batch_id TEXT NOT NULL,
            sensor_type TEXT NOT NULL,
            min REAL NOT NULL,
            max REAL NOT NULL,
            mean REAL NOT NULL,
            std REAL NOT NULL,
            file_name TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            processed_at INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_aggregated_metrics_file
            ON aggregated_metrics(file_name, sensor_type);
        "#,
    )?;

    Ok(())
}

/// Run migrations from `old_version` to current.
///
/// Version 1 is the only schema so far; upgrading only records the version.
fn migrate(conn: &Connection, old_version: i32) -> Result<()> {
    info!(
        "Migrating database schema from v{} to v{}",
        old_version, SCHEMA_VERSION
    );
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}
