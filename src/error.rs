//! Error types for the staging engine.
//!
//! Every variant carries enough context for a developer reading the message
//! to understand what happened and how to get back to a clean state.

use std::io;
use std::path::PathBuf;

use stagehand_git::GitError;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = StagingError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// StagingError
// ---------------------------------------------------------------------------

/// Unified error type for snapshot, apply, restore and hook operations.
#[derive(Debug, Error)]
pub enum StagingError {
    /// A precondition for backing up and restoring the working copy is unmet.
    /// Raised before anything in the repository is touched.
    #[error("{message}\n  To fix: {hint}")]
    Configuration {
        /// What is wrong.
        message: String,
        /// How to fix it.
        hint: String,
    },

    /// A git command failed.
    #[error(transparent)]
    Git(#[from] GitError),

    /// The developer's unstaged edits could not be re-applied on top of the
    /// task output, even with a 3-way merge.
    #[error(
        "could not re-apply unstaged changes from {}: {stderr}\n  The working copy has been restored to its state before the run.",
        patch.display()
    )]
    PatchConflict {
        /// The patch that was rejected.
        patch: PathBuf,
        /// Captured stderr from the final `git apply` attempt.
        stderr: String,
    },

    /// No stash entry carries the expected backup message.
    #[error(
        "backup entry '{message}' not found in `git stash list`.\n  To fix: inspect the stash manually:\n    git stash list"
    )]
    BackupMissing {
        /// The stash message that was searched for.
        message: String,
    },

    /// Restoring the snapshot failed. The stash entry and patch files were
    /// left in place because they are the only remaining copy of the
    /// developer's changes.
    #[error(
        "failed to restore the working copy: {source}\n  Your changes are preserved in the stash entry '{backup}' and in {}.\n  To fix: recover them by hand:\n    git reset --hard HEAD\n    git stash list\n    git stash apply --index stash@{{N}}",
        patches_dir.display()
    )]
    RestoreFailed {
        /// The stash message of the preserved backup entry.
        backup: String,
        /// Directory holding the preserved patch files.
        patches_dir: PathBuf,
        /// Why the restore failed.
        #[source]
        source: Box<Self>,
    },

    /// A filesystem operation failed.
    #[error("{}: {source}", path.display())]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: io::Error,
    },
}

impl StagingError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
