//! Moving files into terminal folders.
//!
//! A destination is never overwritten: if a file with the same base name is
//! already present the move fails with [`Error::RelocationConflict`].

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Base name of `path` as a string.
pub fn file_name(path: &Path) -> Result<String> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| Error::InvalidPath(path.to_path_buf()))
}

/// Where `file` would land inside `dir`, failing if that spot is taken.
pub fn vacant_destination(file: &Path, dir: &Path) -> Result<PathBuf> {
    let dest = dir.join(file_name(file)?);
    match dest.try_exists() {
        Ok(true) => Err(Error::RelocationConflict { path: dest }),
        Ok(false) => Ok(dest),
        Err(e) => Err(Error::io(&dest, e)),
    }
}

/// Move `file` into `dir` under its original base name.
///
/// Falls back to copy-then-remove when the two paths are on different
/// filesystems.
pub fn relocate(file: &Path, dir: &Path) -> Result<PathBuf> {
    let dest = vacant_destination(file, dir)?;

    match fs::rename(file, &dest) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::CrossesDevices => {
            debug!("{} crosses devices, copying instead", file.display());
            fs::copy(file, &dest).map_err(|e| Error::io(&dest, e))?;
            fs::remove_file(file).map_err(|e| Error::io(file, e))?;
        }
        Err(e) => return Err(Error::io(file, e)),
    }

    Ok(dest)
}
