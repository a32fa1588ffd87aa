//! Quarantine for rejected intake files.
//!
//! A rejected file is moved into the quarantine folder under its original
//! name, and a companion file `<name>_error.log` next to it records why.
//!
//! # Example
//!
//! ```no_run
//! use intake_core::QuarantineManager;
//!
//! let quarantine = QuarantineManager::new("quarantine");
//! let record = quarantine.quarantine("data/bad.csv".as_ref(), "pressure out of range")?;
//! assert!(record.reason_path.ends_with("bad.csv_error.log"));
//! # Ok::<(), intake_core::Error>(())
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use intake_types::QuarantineRecord;
use time::OffsetDateTime;
use tracing::warn;

use crate::error::{Error, Result};
use crate::relocate;

/// Suffix appended to a quarantined file's name to form its reason file.
pub const REASON_SUFFIX: &str = "_error.log";

/// Relocates rejected files and records the reason.
#[derive(Debug, Clone)]
pub struct QuarantineManager {
    dir: PathBuf,
}

impl QuarantineManager {
    /// Create a manager for the given quarantine folder.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The quarantine folder.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the quarantine folder if it does not exist.
    ///
    /// On Unix the folder is restricted to its owner.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io(&self.dir, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700))
                .map_err(|e| Error::io(&self.dir, e))?;
        }

        Ok(())
    }

    /// Path of the reason file for a quarantined file name.
    pub fn reason_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(format!("{file_name}{REASON_SUFFIX}"))
    }

    /// Move `file` into quarantine and write `reason` beside it.
    ///
    /// The reason file is written before the move, so a file never sits in
    /// quarantine without one. If either step fails the source stays where
    /// it was and any earlier reason file is put back.
    ///
    /// A previous reason file with the same name is overwritten; a previous
    /// quarantined file with the same name is not, and yields
    /// [`Error::RelocationConflict`].
    pub fn quarantine(&self, file: &Path, reason: &str) -> Result<QuarantineRecord> {
        self.ensure_dir()?;

        relocate::vacant_destination(file, &self.dir)?;
        let file_name = relocate::file_name(file)?;
        let reason_path = self.reason_path(&file_name);

        let previous = fs::read(&reason_path).ok();
        fs::write(&reason_path, reason).map_err(|e| Error::io(&reason_path, e))?;

        let quarantined_path = match relocate::relocate(file, &self.dir) {
            Ok(path) => path,
            Err(e) => {
                let restored = match previous {
                    Some(contents) => fs::write(&reason_path, contents),
                    None => fs::remove_file(&reason_path),
                };
                if let Err(cleanup) = restored {
                    warn!(
                        "Could not roll back {}: {}",
                        reason_path.display(),
                        cleanup
                    );
                }
                return Err(e);
            }
        };

        warn!(
            "Quarantined {} -> {}: {}",
            file.display(),
            quarantined_path.display(),
            reason
        );

        Ok(QuarantineRecord {
            file_name,
            quarantined_path,
            reason_path,
            reason: reason.to_string(),
            quarantined_at: OffsetDateTime::now_utc(),
        })
    }
}
