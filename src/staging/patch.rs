//! Re-application of the developer's unstaged and untracked changes.

use std::fs;
use std::path::Path;

use stagehand_git::{ApplyMode, ApplyOutcome, GitRepo};
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, StagingError};

/// Apply the unstaged-changes patch on top of the task output.
///
/// An empty patch is a no-op. Otherwise a plain apply is tried first; if git
/// rejects it, a 3-way apply is tried using the blob ancestry recorded in the
/// patch. If that is rejected too the run cannot be completed without
/// losing either the task output or the developer's edits.
///
/// # Errors
/// Returns [`StagingError::PatchConflict`] if both attempts are rejected.
#[instrument(skip_all, fields(patch = %patch.display()))]
pub fn merge_unstaged_patch(repo: &dyn GitRepo, patch: &Path) -> Result<()> {
    if file_len(patch)? == 0 {
        debug!("unstaged patch is empty");
        return Ok(());
    }

    let first = repo.apply_patch(patch, ApplyMode::TwoWay)?;
    let ApplyOutcome::Conflict { stderr } = first else {
        debug!("unstaged patch applied");
        return Ok(());
    };
    debug!(%stderr, "2-way apply rejected, retrying with 3-way merge");

    match repo.apply_patch(patch, ApplyMode::ThreeWay)? {
        ApplyOutcome::Applied => {
            info!("unstaged patch applied with 3-way merge");
            Ok(())
        }
        ApplyOutcome::Conflict { stderr } => {
            warn!(%stderr, "3-way apply rejected");
            Err(StagingError::PatchConflict {
                patch: patch.to_owned(),
                stderr,
            })
        }
    }
}

/// Apply the untracked-files patch.
///
/// A patch that is empty after trimming is a no-op. Untracked content cannot
/// overlap task edits to tracked files, so only a plain apply is attempted.
///
/// # Errors
/// Returns [`StagingError::PatchConflict`] if git rejects the patch.
#[instrument(skip_all, fields(patch = %patch.display()))]
pub fn merge_untracked_patch(repo: &dyn GitRepo, patch: &Path) -> Result<()> {
    let contents = fs::read(patch).map_err(|e| StagingError::io(patch, e))?;
    if contents.trim_ascii().is_empty() {
        debug!("untracked patch is empty");
        return Ok(());
    }

    match repo.apply_patch(patch, ApplyMode::TwoWay)? {
        ApplyOutcome::Applied => {
            debug!("untracked patch applied");
            Ok(())
        }
        ApplyOutcome::Conflict { stderr } => Err(StagingError::PatchConflict {
            patch: patch.to_owned(),
            stderr,
        }),
    }
}

fn file_len(path: &Path) -> Result<u64> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| StagingError::io(path, e))
}
