//! Pipeline state shared by the monitor and the processor.
//!
//! A [`PipelineContext`] is built once at startup and owns everything a
//! polling round needs: the validator, the quarantine manager, the
//! persistence gateway, the folder layout, the retry policy and the set of
//! files already dispatched during this run.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;

use intake_core::{Error, PersistenceGateway, QuarantineManager, RetryPolicy, Validator};

use crate::config::Config;

/// Everything needed to process intake files.
pub struct PipelineContext {
    validator: Validator,
    quarantine: QuarantineManager,
    gateway: Arc<dyn PersistenceGateway>,
    data_dir: PathBuf,
    processed_dir: PathBuf,
    file_extension: String,
    retry: RetryPolicy,
    /// Files dispatched during this run, cleared only by a restart.
    seen: HashSet<PathBuf>,
}

impl PipelineContext {
    /// Create a context with default validation, retry and `csv` files.
    pub fn new(
        data_dir: impl Into<PathBuf>,
        processed_dir: impl Into<PathBuf>,
        quarantine_dir: impl Into<PathBuf>,
        gateway: Arc<dyn PersistenceGateway>,
    ) -> Self {
        Self {
            validator: Validator::default(),
            quarantine: QuarantineManager::new(quarantine_dir),
            gateway,
            data_dir: data_dir.into(),
            processed_dir: processed_dir.into(),
            file_extension: "csv".to_string(),
            retry: RetryPolicy::default(),
            seen: HashSet::new(),
        }
    }

    /// Create a context from service configuration.
    pub fn from_config(config: &Config, gateway: Arc<dyn PersistenceGateway>) -> Self {
        let intake = &config.intake;
        Self::new(
            &intake.data_folder,
            &intake.processed_folder,
            &intake.quarantine_folder,
            gateway,
        )
        .with_extension(&intake.file_extension)
        .with_retry_policy(config.retry.policy())
    }

    /// Use a custom validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    /// Use a custom retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Pick up files with this extension (case-insensitive, no dot).
    #[must_use]
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.file_extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Create the data, processed and quarantine folders if absent.
    pub fn ensure_dirs(&self) -> Result<(), Error> {
        for dir in [&self.data_dir, &self.processed_dir] {
            std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        self.quarantine.ensure_dir()?;

        info!(
            "Watching {} (processed: {}, quarantine: {})",
            self.data_dir.display(),
            self.processed_dir.display(),
            self.quarantine.dir().display()
        );
        Ok(())
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    pub fn quarantine(&self) -> &QuarantineManager {
        &self.quarantine
    }

    pub fn gateway(&self) -> &dyn PersistenceGateway {
        self.gateway.as_ref()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn processed_dir(&self) -> &Path {
        &self.processed_dir
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Whether `path` carries the recognized extension.
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.file_extension))
    }

    /// Whether `path` was already dispatched during this run.
    pub fn is_seen(&self, path: &Path) -> bool {
        self.seen.contains(path)
    }

    /// Record `path` as dispatched. Returns false if it already was.
    pub fn mark_seen(&mut self, path: PathBuf) -> bool {
        self.seen.insert(path)
    }

    /// Number of files dispatched during this run.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("data_dir", &self.data_dir)
            .field("processed_dir", &self.processed_dir)
            .field("quarantine_dir", &self.quarantine.dir())
            .field("file_extension", &self.file_extension)
            .field("retry", &self.retry)
            .field("seen", &self.seen.len())
            .finish_non_exhaustive()
    }
}
