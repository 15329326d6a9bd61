//! Preservation of in-progress merge state.
//!
//! `git stash push` and `git reset --hard` both clear the merge marker files.
//! [`MergeStatus`] captures them verbatim before such an operation and writes
//! them back afterwards so a merge commit can still be concluded after the
//! run.

use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{Result, StagingError};

/// Marker holding the commit(s) being merged.
pub const MERGE_HEAD: &str = "MERGE_HEAD";
/// Marker holding merge options such as `no-ff`.
pub const MERGE_MODE: &str = "MERGE_MODE";
/// Marker holding the prepared merge commit message.
pub const MERGE_MSG: &str = "MERGE_MSG";

/// Raw contents of the three merge marker files, each present only if the
/// file existed when saved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeStatus {
    merge_head: Option<Vec<u8>>,
    merge_mode: Option<Vec<u8>>,
    merge_msg: Option<Vec<u8>>,
}

impl MergeStatus {
    /// Read whichever merge markers exist in `common_dir`.
    ///
    /// # Errors
    /// Returns [`StagingError::Io`] if an existing marker cannot be read.
    pub fn save(common_dir: &Path) -> Result<Self> {
        let status = Self {
            merge_head: read_marker(common_dir, MERGE_HEAD)?,
            merge_mode: read_marker(common_dir, MERGE_MODE)?,
            merge_msg: read_marker(common_dir, MERGE_MSG)?,
        };
        if status.is_merging() {
            debug!("saved in-progress merge state");
        }
        Ok(status)
    }

    /// Write back every marker that was present when saved. Markers that
    /// were absent are left alone.
    ///
    /// # Errors
    /// Returns [`StagingError::Io`] if a marker cannot be written.
    pub fn restore(&self, common_dir: &Path) -> Result<()> {
        write_marker(common_dir, MERGE_HEAD, self.merge_head.as_deref())?;
        write_marker(common_dir, MERGE_MODE, self.merge_mode.as_deref())?;
        write_marker(common_dir, MERGE_MSG, self.merge_msg.as_deref())?;
        Ok(())
    }

    /// `true` if a merge was in progress when saved.
    #[must_use]
    pub const fn is_merging(&self) -> bool {
        self.merge_head.is_some()
    }

    /// Run `op` with the merge markers saved before and restored after it.
    ///
    /// The markers are restored even when `op` fails; the error from `op`
    /// takes precedence over a failure to restore.
    ///
    /// # Errors
    /// Returns the error from `op`, or from saving or restoring the markers.
    pub fn preserve<T>(common_dir: &Path, op: impl FnOnce() -> Result<T>) -> Result<T> {
        let saved = Self::save(common_dir)?;
        let result = op();
        match (result, saved.restore(common_dir)) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(restore_err)) => {
                warn!(error = %restore_err, "could not restore merge markers");
                Err(e)
            }
        }
    }
}

fn read_marker(common_dir: &Path, name: &str) -> Result<Option<Vec<u8>>> {
    let path = common_dir.join(name);
    match fs::read(&path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StagingError::io(path, e)),
    }
}

fn write_marker(common_dir: &Path, name: &str, contents: Option<&[u8]>) -> Result<()> {
    let Some(contents) = contents else {
        return Ok(());
    };
    let path = common_dir.join(name);
    fs::write(&path, contents).map_err(|e| StagingError::io(path, e))
}
