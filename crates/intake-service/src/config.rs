//! Service configuration.
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. A TOML file (`~/.config/sensor-intake/intake.toml` by default)
//! 2. Environment variables (optionally loaded from a `.env` file)
//! 3. Command-line flags
//!
//! ```toml
//! [intake]
//! data_folder = "data"
//! processed_folder = "processed"
//! quarantine_folder = "quarantine"
//! file_extension = "csv"
//! monitor_interval = 5
//!
//! [storage]
//! path = "readings.db"
//!
//! [retry]
//! max_attempts = 5
//! multiplier = 1.0
//! min_delay_secs = 2
//! max_delay_secs = 10
//! jitter = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use intake_core::RetryPolicy;

/// Environment variables that map onto configuration fields.
pub const ENV_DATA_FOLDER: &str = "DATA_FOLDER";
pub const ENV_PROCESSED_FOLDER: &str = "PROCESSED_FOLDER";
pub const ENV_QUARANTINE_FOLDER: &str = "QUARANTINE_FOLDER";
pub const ENV_MONITOR_INTERVAL: &str = "MONITOR_INTERVAL";
pub const ENV_FILE_EXTENSION: &str = "FILE_EXTENSION";
pub const ENV_DB_NAME: &str = "DB_NAME";

/// Connection settings for server databases. SQLite has no use for them.
pub const IGNORED_DB_VARS: [&str; 4] = ["DB_USER", "DB_PASSWORD", "DB_HOST", "DB_PORT"];

/// Maximum monitor interval in seconds (1 day).
pub const MAX_MONITOR_INTERVAL: u64 = 86_400;
/// Maximum number of processing attempts per file.
pub const MAX_ATTEMPTS: u32 = 20;

/// Service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Folder layout and polling.
    pub intake: IntakeConfig,
    /// Database settings.
    pub storage: StorageConfig,
    /// Per-file retry behavior.
    pub retry: RetryConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any variable lookup.
    ///
    /// Blank values are treated as unset.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(folder) = var(ENV_DATA_FOLDER) {
            self.intake.data_folder = PathBuf::from(folder);
        }
        if let Some(folder) = var(ENV_PROCESSED_FOLDER) {
            self.intake.processed_folder = PathBuf::from(folder);
        }
        if let Some(folder) = var(ENV_QUARANTINE_FOLDER) {
            self.intake.quarantine_folder = PathBuf::from(folder);
        }
        if let Some(ext) = var(ENV_FILE_EXTENSION) {
            self.intake.file_extension = ext;
        }
        if let Some(interval) = var(ENV_MONITOR_INTERVAL) {
            self.intake.monitor_interval =
                interval.parse().map_err(|_| ConfigError::Env {
                    key: ENV_MONITOR_INTERVAL.to_string(),
                    value: interval.clone(),
                })?;
        }
        if let Some(db) = var(ENV_DB_NAME) {
            self.storage.path = PathBuf::from(db);
        }

        for key in IGNORED_DB_VARS {
            if var(key).is_some() {
                warn!("{} is set but has no effect on the embedded database", key);
            }
        }

        Ok(())
    }

    /// Validate the configuration and return any errors.
    ///
    /// This checks:
    /// - Folder paths are not empty and are pairwise distinct
    /// - The file extension is a bare extension
    /// - The monitor interval is between 1 second and 1 day
    /// - Retry settings describe a usable backoff
    ///
    /// # Example
    ///
    /// ```
    /// use intake_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        errors.extend(self.intake.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.retry.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Folder layout and polling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Folder watched for new files.
    pub data_folder: PathBuf,
    /// Where successfully stored files are moved.
    pub processed_folder: PathBuf,
    /// Where rejected files are moved.
    pub quarantine_folder: PathBuf,
    /// Extension of files to pick up, without the dot.
    pub file_extension: String,
    /// Seconds between polls of the data folder.
    pub monitor_interval: u64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            data_folder: PathBuf::from("data"),
            processed_folder: PathBuf::from("processed"),
            quarantine_folder: PathBuf::from("quarantine"),
            file_extension: "csv".to_string(),
            monitor_interval: 5,
        }
    }
}

impl IntakeConfig {
    /// Polling interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval)
    }

    /// Validate folder and polling configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let folders = [
            ("intake.data_folder", &self.data_folder),
            ("intake.processed_folder", &self.processed_folder),
            ("intake.quarantine_folder", &self.quarantine_folder),
        ];
        for (field, path) in folders {
            if path.as_os_str().is_empty() {
                errors.push(ValidationError {
                    field: field.to_string(),
                    message: "folder path cannot be empty".to_string(),
                });
            }
        }
        for (i, (field, path)) in folders.iter().enumerate() {
            for (other, other_path) in &folders[i + 1..] {
                if !path.as_os_str().is_empty() && path == other_path {
                    errors.push(ValidationError {
                        field: field.to_string(),
                        message: format!("must differ from {}", other),
                    });
                }
            }
        }

        if self.file_extension.is_empty() {
            errors.push(ValidationError {
                field: "intake.file_extension".to_string(),
                message: "file extension cannot be empty".to_string(),
            });
        } else if self.file_extension.contains(['.', '/', '\\']) {
            errors.push(ValidationError {
                field: "intake.file_extension".to_string(),
                message: format!(
                    "invalid file extension '{}': expected a bare extension like 'csv'",
                    self.file_extension
                ),
            });
        }

        if self.monitor_interval == 0 {
            errors.push(ValidationError {
                field: "intake.monitor_interval".to_string(),
                message: "monitor interval cannot be 0".to_string(),
            });
        } else if self.monitor_interval > MAX_MONITOR_INTERVAL {
            errors.push(ValidationError {
                field: "intake.monitor_interval".to_string(),
                message: format!(
                    "monitor interval {} is too long (maximum {} seconds / 1 day)",
                    self.monitor_interval, MAX_MONITOR_INTERVAL
                ),
            });
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path.
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: intake_store::default_db_path(),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.path".to_string(),
                message: "database path cannot be empty".to_string(),
            });
        }

        errors
    }
}

/// Retry configuration for processing a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per file, including the first.
    pub max_attempts: u32,
    /// Backoff multiplier in seconds.
    pub multiplier: f64,
    /// Shortest wait between attempts.
    pub min_delay_secs: u64,
    /// Longest wait between attempts.
    pub max_delay_secs: u64,
    /// Add random jitter to waits.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            multiplier: policy.multiplier,
            min_delay_secs: policy.min_delay.as_secs(),
            max_delay_secs: policy.max_delay.as_secs(),
            jitter: policy.jitter,
        }
    }
}

impl RetryConfig {
    /// The retry policy described by this configuration.
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts)
            .multiplier(self.multiplier)
            .min_delay(Duration::from_secs(self.min_delay_secs))
            .max_delay(Duration::from_secs(self.max_delay_secs))
            .jitter(self.jitter)
    }

    /// Validate retry configuration.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.max_attempts == 0 {
            errors.push(ValidationError {
                field: "retry.max_attempts".to_string(),
                message: "at least one attempt is required".to_string(),
            });
        } else if self.max_attempts > MAX_ATTEMPTS {
            errors.push(ValidationError {
                field: "retry.max_attempts".to_string(),
                message: format!(
                    "{} attempts is too many (maximum {})",
                    self.max_attempts, MAX_ATTEMPTS
                ),
            });
        }

        if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
            errors.push(ValidationError {
                field: "retry.multiplier".to_string(),
                message: format!("multiplier {} must be a positive number", self.multiplier),
            });
        }

        if self.min_delay_secs > self.max_delay_secs {
            errors.push(ValidationError {
                field: "retry.min_delay_secs".to_string(),
                message: format!(
                    "minimum delay {}s exceeds maximum delay {}s",
                    self.min_delay_secs, self.max_delay_secs
                ),
            });
        }

        errors
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid value for {key}: {value:?}")]
    Env { key: String, value: String },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `intake.monitor_interval`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("sensor-intake")
        .join("intake.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.intake.data_folder, PathBuf::from("data"));
        assert_eq!(config.intake.processed_folder, PathBuf::from("processed"));
        assert_eq!(config.intake.quarantine_folder, PathBuf::from("quarantine"));
        assert_eq!(config.intake.file_extension, "csv");
        assert_eq!(config.intake.monitor_interval, 5);
        assert_eq!(config.storage.path, intake_store::default_db_path());
    }

    #[test]
    fn test_retry_config_matches_policy_default() {
        assert_eq!(RetryConfig::default().policy(), RetryPolicy::default());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("intake.toml");

        let mut config = Config::default();
        config.intake.data_folder = PathBuf::from("/srv/incoming");
        config.intake.monitor_interval = 30;
        config.storage.path = PathBuf::from("/tmp/test.db");
        config.retry.max_attempts = 3;

        config.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/intake.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "this is not valid { toml").unwrap();

        let result = Config::load(&config_path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [intake]
            data_folder = "incoming"

            [retry]
            jitter = true
            "#,
        )
        .unwrap();
        assert_eq!(config.intake.data_folder, PathBuf::from("incoming"));
        assert_eq!(config.intake.processed_folder, PathBuf::from("processed"));
        assert_eq!(config.intake.monitor_interval, 5);
        assert!(config.retry.jitter);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("sensor-intake/intake.toml"));
    }

    #[test]
    fn test_apply_vars_overrides() {
        let mut config = Config::default();
        config
            .apply_vars(vars(&[
                ("DATA_FOLDER", "in"),
                ("PROCESSED_FOLDER", "done"),
                ("QUARANTINE_FOLDER", "bad"),
                ("MONITOR_INTERVAL", " 12 "),
                ("FILE_EXTENSION", "tsv"),
                ("DB_NAME", "/var/lib/intake.db"),
            ]))
            .unwrap();

        assert_eq!(config.intake.data_folder, PathBuf::from("in"));
        assert_eq!(config.intake.processed_folder, PathBuf::from("done"));
        assert_eq!(config.intake.quarantine_folder, PathBuf::from("bad"));
        assert_eq!(config.intake.monitor_interval, 12);
        assert_eq!(config.intake.file_extension, "tsv");
        assert_eq!(config.storage.path, PathBuf::from("/var/lib/intake.db"));
    }

    #[test]
    fn test_apply_vars_ignores_blank_and_db_credentials() {
        let mut config = Config::default();
        config
            .apply_vars(vars(&[
                ("DATA_FOLDER", "   "),
                ("DB_USER", "postgres"),
                ("DB_PORT", "5432"),
            ]))
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_apply_vars_bad_interval() {
        let mut config = Config::default();
        let result = config.apply_vars(vars(&[("MONITOR_INTERVAL", "soon")]));
        match result {
            Err(ConfigError::Env { key, value }) => {
                assert_eq!(key, "MONITOR_INTERVAL");
                assert_eq!(value, "soon");
            }
            other => panic!("expected env error, got {:?}", other),
        }
    }

    #[test]
    fn test_default_config_validates() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_folder_validation() {
        let mut config = Config::default();
        config.intake.processed_folder = PathBuf::new();
        config.intake.quarantine_folder = PathBuf::from("data");

        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        assert!(
            errors
                .iter()
                .any(|e| e.field == "intake.processed_folder" && e.message.contains("empty"))
        );
        assert!(
            errors
                .iter()
                .any(|e| e.field == "intake.data_folder"
                    && e.message.contains("intake.quarantine_folder"))
        );
    }

    #[test]
    fn test_extension_and_interval_validation() {
        let mut config = Config::default();
        config.intake.file_extension = ".csv".to_string();
        config.intake.monitor_interval = 0;

        let Err(ConfigError::Validation(errors)) = config.validate() else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 2);

        config.intake.file_extension = "csv".to_string();
        config.intake.monitor_interval = MAX_MONITOR_INTERVAL + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_retry_validation() {
        let retry = RetryConfig {
            max_attempts: 0,
            multiplier: f64::NAN,
            min_delay_secs: 20,
            max_delay_secs: 10,
            jitter: false,
        };
        let errors = retry.validate();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_config_validation_error_display() {
        let errors = vec![
            ValidationError {
                field: "intake.monitor_interval".to_string(),
                message: "monitor interval cannot be 0".to_string(),
            },
            ValidationError {
                field: "storage.path".to_string(),
                message: "cannot be empty".to_string(),
            },
        ];
        let display = ConfigError::Validation(errors).to_string();
        assert!(display.contains("intake.monitor_interval"));
        assert!(display.contains("storage.path"));
    }
}
