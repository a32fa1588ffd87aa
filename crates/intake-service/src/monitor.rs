//! Folder monitor: polls the data folder and dispatches new files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use intake_core::{Error, Result};

use crate::context::PipelineContext;
use crate::processor::{ProcessOutcome, process_file};

/// Outcomes of one polling round, in dispatch order.
#[derive(Debug, Default)]
pub struct PollReport {
    /// Each dispatched file with how it ended.
    pub outcomes: Vec<(PathBuf, ProcessOutcome)>,
}

impl PollReport {
    /// Files stored and moved to the processed folder.
    pub fn processed(&self) -> usize {
        self.count(ProcessOutcome::is_processed)
    }

    /// Files moved to quarantine.
    pub fn quarantined(&self) -> usize {
        self.count(ProcessOutcome::is_quarantined)
    }

    /// Files left in place after every attempt failed.
    pub fn failed(&self) -> usize {
        self.count(ProcessOutcome::is_failed)
    }

    /// Whether no file was dispatched.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    fn count(&self, pred: fn(&ProcessOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

/// Polls the data folder on a fixed interval.
///
/// Files are handled one at a time, to completion, in name order. Each file
/// is dispatched at most once per run whatever its outcome.
#[derive(Debug)]
pub struct FolderMonitor {
    ctx: PipelineContext,
    interval: Duration,
}

impl FolderMonitor {
    /// Create a monitor polling every `interval`.
    pub fn new(ctx: PipelineContext, interval: Duration) -> Self {
        Self { ctx, interval }
    }

    /// The pipeline state, including the seen set.
    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// Time between polls.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Scan the data folder once and process every new matching file.
    ///
    /// Only a failure to list the folder is returned as an error.
    pub async fn poll_once(&mut self) -> Result<PollReport> {
        let candidates = list_candidates(&self.ctx)?;
        let mut report = PollReport::default();

        for path in candidates {
            if self.ctx.is_seen(&path) {
                continue;
            }

            debug!("Dispatching {}", path.display());
            let outcome = process_file(&self.ctx, &path).await;
            self.ctx.mark_seen(path.clone());
            report.outcomes.push((path, outcome));
        }

        if !report.is_empty() {
            info!(
                "Poll finished: {} processed, {} quarantined, {} failed",
                report.processed(),
                report.quarantined(),
                report.failed()
            );
        }

        Ok(report)
    }

    /// Poll forever, sleeping the configured interval between rounds.
    pub async fn run(&mut self) {
        info!(
            "Monitoring {} every {:?}",
            self.ctx.data_dir().display(),
            self.interval
        );

        loop {
            if let Err(e) = self.poll_once().await {
                error!("Failed to scan {}: {}", self.ctx.data_dir().display(), e);
            }
            sleep(self.interval).await;
        }
    }
}

/// Regular files with the recognized extension, sorted by name.
fn list_candidates(ctx: &PipelineContext) -> Result<Vec<PathBuf>> {
    let dir = ctx.data_dir();
    let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if is_regular_file(&path) && ctx.matches_extension(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn is_regular_file(path: &Path) -> bool {
    std::fs::metadata(path).is_ok_and(|m| m.is_file())
}
