//! Retrying processor for a single intake file.
//!
//! One attempt runs validate, aggregate, persist and relocate in that order.
//! The whole attempt is retried under the context's [`RetryPolicy`]
//! (`intake_core::RetryPolicy`), except that a quarantined file is a finished
//! file: rejection is never retried.
//!
//! Once a batch has been persisted, later attempts only retry the move into
//! the processed folder so the same rows are not written twice.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::{error, info};

use intake_core::relocate::{relocate, vacant_destination};
use intake_core::{Error, Result, ValidationOutcome, metrics, with_retry};
use intake_types::QuarantineRecord;

use crate::context::PipelineContext;

/// How processing one file ended.
#[derive(Debug)]
pub enum ProcessOutcome {
    /// Stored and moved to the processed folder.
    Processed {
        rows: usize,
        destination: PathBuf,
        attempts: u32,
    },
    /// Rejected and moved to quarantine.
    Quarantined(QuarantineRecord),
    /// Every attempt failed; the file was left where it was.
    Failed { attempts: u32, error: Error },
}

impl ProcessOutcome {
    /// Whether the file was stored and moved to the processed folder.
    pub fn is_processed(&self) -> bool {
        matches!(self, ProcessOutcome::Processed { .. })
    }

    /// Whether the file was moved to quarantine.
    pub fn is_quarantined(&self) -> bool {
        matches!(self, ProcessOutcome::Quarantined(_))
    }

    /// Whether every attempt failed.
    pub fn is_failed(&self) -> bool {
        matches!(self, ProcessOutcome::Failed { .. })
    }
}

enum Step {
    Stored { rows: usize, destination: PathBuf },
    Quarantined(QuarantineRecord),
}

/// Process one file to completion, including every retry.
///
/// Never returns an error: failures are logged and reported as
/// [`ProcessOutcome::Failed`].
pub async fn process_file(ctx: &PipelineContext, path: &Path) -> ProcessOutcome {
    let attempts = AtomicU32::new(0);
    let persisted = OnceLock::new();
    let name = path.display().to_string();

    let result = with_retry(ctx.retry_policy(), &name, |attempt| {
        attempts.store(attempt, Ordering::SeqCst);
        attempt_once(ctx, path, &persisted)
    })
    .await;
    let attempts = attempts.load(Ordering::SeqCst);

    match result {
        Ok(Step::Stored { rows, destination }) => {
            info!(
                "Processed {} ({} rows) -> {}",
                name,
                rows,
                destination.display()
            );
            ProcessOutcome::Processed {
                rows,
                destination,
                attempts,
            }
        }
        Ok(Step::Quarantined(record)) => ProcessOutcome::Quarantined(record),
        Err(e) => {
            error!(
                "Giving up on {} after {} attempt(s), leaving it in place: {}",
                name, attempts, e
            );
            ProcessOutcome::Failed { attempts, error: e }
        }
    }
}

async fn attempt_once(
    ctx: &PipelineContext,
    path: &Path,
    persisted: &OnceLock<usize>,
) -> Result<Step> {
    if let Some(&rows) = persisted.get() {
        let destination = relocate(path, ctx.processed_dir())?;
        return Ok(Step::Stored { rows, destination });
    }

    let batch = match ctx
        .validator()
        .validate_and_transform(path, ctx.quarantine())?
    {
        ValidationOutcome::Accepted(batch) => batch,
        ValidationOutcome::Quarantined(record) => return Ok(Step::Quarantined(record)),
    };
    let metrics = metrics::aggregate(&batch)?;

    // Refuse before writing rows that could never be matched to a moved file
    vacant_destination(path, ctx.processed_dir())?;

    let summary = ctx.gateway().persist(&batch, &metrics).await?;
    let _ = persisted.set(summary.readings);

    let destination = relocate(path, ctx.processed_dir())?;
    Ok(Step::Stored {
        rows: summary.readings,
        destination,
    })
}
