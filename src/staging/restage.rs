//! Re-staging of task output.
//!
//! After a successful run, only files that were staged to begin with and
//! were then modified by a task go back into the index. Tasks often run
//! across the whole tree; their edits to files the developer did not stage
//! stay unstaged.

use std::collections::HashSet;
use std::path::PathBuf;

use stagehand_git::{GitRepo, LsFilter};
use tracing::{debug, info, instrument};

use crate::error::Result;
use crate::platform::MaxCommandLength;

/// Split `paths` into contiguous `git add` batches.
///
/// The batch count target is
/// `N = min(ceil(len(paths joined by ' ') / max), paths.len())` and every
/// batch holds `paths.len() / N` paths, except a shorter final one. This is
/// an approximation of the command-line budget, not a bin-packing.
#[must_use]
pub fn plan_batches(paths: &[PathBuf], max: MaxCommandLength) -> Vec<&[PathBuf]> {
    if paths.is_empty() {
        return Vec::new();
    }
    let joined_len = joined_length(paths);
    let target = joined_len.div_ceil(max.get()).min(paths.len()).max(1);
    let batch_len = paths.len() / target;
    paths.chunks(batch_len).collect()
}

/// Length of the paths joined by single spaces.
fn joined_length(paths: &[PathBuf]) -> usize {
    let total: usize = paths.iter().map(|p| p.as_os_str().len()).sum();
    total + paths.len().saturating_sub(1)
}

/// Re-add the originally staged files that are now modified in the working
/// tree.
///
/// A no-op when nothing at all is modified.
///
/// # Errors
/// Returns [`StagingError::Git`](crate::error::StagingError::Git) if listing
/// or adding fails.
#[instrument(skip_all, fields(staged = originally_staged.len(), max = %max))]
pub fn stage_modifications(
    repo: &dyn GitRepo,
    originally_staged: &[PathBuf],
    max: MaxCommandLength,
) -> Result<()> {
    let modified = repo.ls_files(LsFilter::Modified)?;
    if modified.is_empty() {
        debug!("no modified files, nothing to re-stage");
        return Ok(());
    }

    let modified: HashSet<&PathBuf> = modified.iter().collect();
    let to_stage: Vec<PathBuf> = originally_staged
        .iter()
        .filter(|p| modified.contains(p))
        .cloned()
        .collect();

    let batches = plan_batches(&to_stage, max);
    for batch in &batches {
        repo.add(batch)?;
    }
    info!(files = to_stage.len(), batches = batches.len(), "re-staged task output");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
