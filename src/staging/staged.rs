//! The set of files currently staged for commit.

use std::path::PathBuf;

use stagehand_git::GitRepo;
use tracing::{debug, instrument};

use crate::error::Result;

/// Absolute paths of files staged as added, copied, modified or renamed.
///
/// Staged deletions are excluded: a task cannot modify a deleted file in a
/// way that would need re-staging.
///
/// # Errors
/// Returns [`StagingError::Git`](crate::error::StagingError::Git) if git fails.
#[instrument(skip_all)]
pub fn staged_files(repo: &dyn GitRepo) -> Result<Vec<PathBuf>> {
    let files = repo.staged_files()?;
    debug!(count = files.len(), "resolved staged files");
    Ok(files)
}

/// `true` if nothing is staged (ignoring staged deletions).
///
/// # Errors
/// Returns [`StagingError::Git`](crate::error::StagingError::Git) if git fails.
pub fn is_staging_empty(repo: &dyn GitRepo) -> Result<bool> {
    Ok(staged_files(repo)?.is_empty())
}
