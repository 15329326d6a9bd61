//! Orchestration of one staging run: save, apply or restore, delete.
//!
//! ```text
//! StagingSession::start ──► (tasks run) ──► finish(Succeeded) ──► apply ──┐
//!                                      └──► finish(Failed) ─────► restore ┤
//!                                                                         ▼
//!                                                                      delete
//! ```
//!
//! If applying fails the working copy is restored before the error is
//! returned. If restoring fails, the stash entry and patch files are kept:
//! they are then the only copy of the developer's work.

use stagehand_git::GitRepo;
use tracing::{info, instrument, warn};

use crate::config::StagingSettings;
use crate::error::{Result, StagingError};
use crate::platform::MaxCommandLength;
use crate::staging::merge_status::MergeStatus;
use crate::staging::snapshot::{self, Snapshot};
use crate::staging::{patch, restage, staged};

/// How the tasks run against the snapshot ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Every task succeeded; fold the output back in.
    Succeeded,
    /// A task failed; put everything back as it was.
    Failed,
}

/// Result of [`run_staged`].
#[derive(Debug)]
pub enum RunOutcome<E> {
    /// Nothing was staged, so no snapshot was taken and the task never ran.
    NothingStaged,
    /// The task succeeded and its output was applied.
    Completed,
    /// The task failed and the working copy was restored.
    TaskFailed(E),
}

// ---------------------------------------------------------------------------
// Orchestrator operations
// ---------------------------------------------------------------------------

/// Fold task output back into the index and re-apply the developer's
/// unstaged and untracked changes.
///
/// When the working tree and index are clean after re-staging, the unstaged
/// patch is skipped. The untracked patch is applied in both cases.
///
/// # Errors
/// Returns [`StagingError::PatchConflict`] if a patch cannot be applied, or
/// any git or I/O error.
#[instrument(skip_all)]
pub fn apply_modifications(
    repo: &dyn GitRepo,
    snapshot: &Snapshot,
    max_command_length: MaxCommandLength,
) -> Result<()> {
    restage::stage_modifications(repo, snapshot.staged_files(), max_command_length)?;

    if repo.status(false)?.is_empty() {
        info!("working tree clean after re-staging, skipping unstaged patch");
    } else {
        patch::merge_unstaged_patch(repo, snapshot.unstaged_patch_file())?;
    }
    patch::merge_untracked_patch(repo, snapshot.untracked_patch_file())?;
    info!("modifications applied");
    Ok(())
}

/// Discard everything the tasks did and bring back the exact pre-run index
/// and working tree, keeping any in-progress merge.
///
/// # Errors
/// Returns [`StagingError::BackupMissing`] if the stash entry is gone, or any
/// git or I/O error.
#[instrument(skip_all, fields(backup = snapshot.stash_message()))]
pub fn restore_snapshot(repo: &dyn GitRepo, snapshot: &Snapshot) -> Result<()> {
    let common_dir = repo.common_dir();
    let merge_status = MergeStatus::save(common_dir)?;
    repo.reset_hard()?;
    let stash = snapshot::find_stash(repo, snapshot.stash_message())?;
    repo.stash_apply_index(stash)?;
    merge_status.restore(common_dir)?;
    info!(%stash, "working copy restored");
    Ok(())
}

// ---------------------------------------------------------------------------
// StagingSession
// ---------------------------------------------------------------------------

/// A live snapshot. Must be consumed by [`StagingSession::finish`].
#[must_use = "a session left unfinished leaves its backup stash entry behind"]
pub struct StagingSession<'r> {
    repo: &'r dyn GitRepo,
    max_command_length: MaxCommandLength,
    snapshot: Snapshot,
}

impl<'r> StagingSession<'r> {
    /// Take a snapshot if anything is staged.
    ///
    /// Returns `Ok(None)` without touching the repository when nothing is
    /// staged.
    ///
    /// # Errors
    /// Returns [`StagingError::Configuration`] if a scratch directory is not
    /// ignored, or any error from saving the snapshot.
    pub fn start(repo: &'r dyn GitRepo, settings: &StagingSettings) -> Result<Option<Self>> {
        if staged::is_staging_empty(repo)? {
            warn!("nothing staged for commit, skipping");
            return Ok(None);
        }
        let snapshot = snapshot::save(repo, settings)?;
        Ok(Some(Self {
            repo,
            max_command_length: settings.max_command_length,
            snapshot,
        }))
    }

    /// The snapshot taken at start.
    pub const fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Apply or restore depending on `outcome`, then delete the snapshot.
    ///
    /// # Errors
    /// - The apply error, after the working copy has been restored.
    /// - [`StagingError::RestoreFailed`] if restoring failed; the snapshot is
    ///   kept for manual recovery.
    /// - A delete error if apply or restore succeeded but cleanup did not.
    #[instrument(skip_all, fields(outcome = ?outcome))]
    pub fn finish(self, outcome: TaskOutcome) -> Result<()> {
        let result = match outcome {
            TaskOutcome::Succeeded => {
                match apply_modifications(self.repo, &self.snapshot, self.max_command_length) {
                    Ok(()) => Ok(()),
                    Err(apply_err) => {
                        warn!(error = %apply_err, "applying modifications failed, restoring");
                        if let Err(restore_err) = restore_snapshot(self.repo, &self.snapshot) {
                            return Err(self.restore_failed(restore_err));
                        }
                        Err(apply_err)
                    }
                }
            }
            TaskOutcome::Failed => {
                if let Err(restore_err) = restore_snapshot(self.repo, &self.snapshot) {
                    return Err(self.restore_failed(restore_err));
                }
                Ok(())
            }
        };

        match (result, snapshot::delete(self.repo, &self.snapshot)) {
            (Ok(()), delete_result) => delete_result,
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(delete_err)) => {
                warn!(error = %delete_err, "could not delete snapshot");
                Err(e)
            }
        }
    }

    fn restore_failed(&self, source: StagingError) -> StagingError {
        warn!(error = %source, "restore failed, keeping snapshot");
        StagingError::RestoreFailed {
            backup: self.snapshot.stash_message().to_owned(),
            patches_dir: self.repo.common_dir().to_owned(),
            source: Box::new(source),
        }
    }
}

/// Run `task` against a snapshot of the staged files.
///
/// Takes the snapshot, hands it to `task`, then applies or restores based on
/// the task's result and deletes the snapshot. A task error is returned as
/// [`RunOutcome::TaskFailed`] once the working copy is back to its pre-run
/// state.
///
/// # Errors
/// Any [`StagingError`] from taking, applying, restoring or deleting the
/// snapshot.
pub fn run_staged<E>(
    repo: &dyn GitRepo,
    settings: &StagingSettings,
    task: impl FnOnce(&Snapshot) -> Result<(), E>,
) -> Result<RunOutcome<E>> {
    let Some(session) = StagingSession::start(repo, settings)? else {
        return Ok(RunOutcome::NothingStaged);
    };
    match task(session.snapshot()) {
        Ok(()) => {
            session.finish(TaskOutcome::Succeeded)?;
            Ok(RunOutcome::Completed)
        }
        Err(task_err) => {
            session.finish(TaskOutcome::Failed)?;
            Ok(RunOutcome::TaskFailed(task_err))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
