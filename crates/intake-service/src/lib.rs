//! Folder-watching intake service for sensor files.
//!
//! The service polls a data folder and, for each new file:
//! - Validates every row and z-score normalizes temperature and pressure
//! - Moves rejected files to a quarantine folder with a reason file
//! - Computes min/max/mean/std per field
//! - Stores readings and metrics in one transaction
//! - Moves stored files to a processed folder
//!
//! Storage and relocation failures are retried with exponential backoff. A
//! file that still fails is left in the data folder for an operator.
//!
//! # Configuration
//!
//! The service reads `~/.config/sensor-intake/intake.toml`, then applies
//! environment overrides (`DATA_FOLDER`, `PROCESSED_FOLDER`,
//! `QUARANTINE_FOLDER`, `MONITOR_INTERVAL`, `FILE_EXTENSION`, `DB_NAME`). A
//! `.env` file in the working directory is loaded first.
//!
//! ```toml
//! [intake]
//! data_folder = "data"
//! monitor_interval = 5
//!
//! [storage]
//! path = "~/.local/share/sensor-intake/readings.db"
//! ```

pub mod config;
pub mod context;
pub mod monitor;
pub mod processor;

pub use config::{
    Config, ConfigError, IntakeConfig, RetryConfig, StorageConfig, ValidationError,
    default_config_path,
};
pub use context::PipelineContext;
pub use monitor::{FolderMonitor, PollReport};
pub use processor::{ProcessOutcome, process_file};
