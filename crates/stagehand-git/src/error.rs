//! Error types for git operations.
//!
//! [`GitError`] is the single error type returned by all [`GitRepo`](crate::GitRepo) trait
//! methods. A non-zero exit from the git binary always surfaces as
//! [`GitError::CommandFailed`] carrying the command line, exit code and
//! captured stderr, so callers can report exactly what was attempted.

use thiserror::Error;

/// Errors returned by [`GitRepo`](crate::GitRepo) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The git binary exited with a non-zero status.
    #[error("`{command}` exited with code {}: {stderr}", exit_code.map_or_else(|| "<signal>".to_owned(), |c| c.to_string()))]
    CommandFailed {
        /// The full command line that was run (e.g. `"git stash push ..."`).
        command: String,
        /// The process exit code, or `None` if the process was killed by a signal.
        exit_code: Option<i32>,
        /// Captured stderr, trimmed.
        stderr: String,
    },

    /// The working directory is not inside a git repository, or the
    /// repository has no working tree.
    #[error("repository discovery failed: {message}")]
    Discovery {
        /// Why discovery failed.
        message: String,
    },

    /// A requested object, stash entry, or path was not found.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable description of what was missing.
        message: String,
    },

    /// git produced output that could not be interpreted.
    #[error("unexpected output from `{command}`: {message}")]
    InvalidOutput {
        /// The command whose output was malformed.
        command: String,
        /// What was wrong with it.
        message: String,
    },

    /// An I/O error occurred (process spawn, file system, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
