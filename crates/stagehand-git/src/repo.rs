//! The [`GitRepo`] trait, the only boundary between the staging engine and git.
//!
//! The trait covers exactly the command vocabulary the engine needs and
//! nothing more. It is object-safe so callers can hold `&dyn GitRepo`.
//!
//! | Group   | Methods                                                        |
//! |---------|----------------------------------------------------------------|
//! | Layout  | `top_level`, `common_dir`                                      |
//! | Status  | `status`, `staged_files`, `ls_files`                           |
//! | Diff    | `diff_reverse_to_file`, `show_to_file`, `rev_exists`           |
//! | Apply   | `apply_patch`                                                  |
//! | Stash   | `stash_push`, `stash_list`, `stash_apply_index`, `stash_drop`  |
//! | Index   | `add`, `reset_hard`                                            |

use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::types::{ApplyMode, ApplyOutcome, LsFilter, StashName, Status};

/// The git abstraction used by the staging engine.
///
/// All operations block until the underlying command finishes and buffer its
/// output in full.
pub trait GitRepo {
    // -----------------------------------------------------------------------
    // Layout
    // -----------------------------------------------------------------------

    /// Absolute path of the working tree root.
    fn top_level(&self) -> &Path;

    /// Absolute path of the common metadata directory (the `.git` directory
    /// of the main worktree, shared by linked worktrees).
    fn common_dir(&self) -> &Path;

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Working-tree status.
    ///
    /// Replaces: `git status --porcelain -z [--ignored]`.
    fn status(&self, include_ignored: bool) -> Result<Status, GitError>;

    /// Absolute paths of files staged as added, copied, modified or renamed.
    ///
    /// Replaces: `git diff --staged --diff-filter=ACMR --name-only -z`.
    fn staged_files(&self) -> Result<Vec<PathBuf>, GitError>;

    /// Absolute paths of tracked files matching `filter`.
    ///
    /// Replaces: `git ls-files -z --deleted|--modified`.
    fn ls_files(&self, filter: LsFilter) -> Result<Vec<PathBuf>, GitError>;

    // -----------------------------------------------------------------------
    // Diff
    // -----------------------------------------------------------------------

    /// Write the reverse binary zero-context diff between the working tree
    /// and `rev` into `out`.
    ///
    /// Replaces: `git diff --binary --unified=0 ... --output=<out> <rev> -R`.
    fn diff_reverse_to_file(&self, rev: &str, out: &Path) -> Result<(), GitError>;

    /// Write the binary zero-context patch introduced by commit `rev` into
    /// `out`, with no commit header.
    ///
    /// Replaces: `git show --binary --unified=0 ... --format=%b --output=<out> <rev>`.
    fn show_to_file(&self, rev: &str, out: &Path) -> Result<(), GitError>;

    /// `true` if `rev` resolves to an object.
    ///
    /// Replaces: `git rev-parse --verify --quiet <rev>`.
    fn rev_exists(&self, rev: &str) -> Result<bool, GitError>;

    // -----------------------------------------------------------------------
    // Apply
    // -----------------------------------------------------------------------

    /// Apply `patch` to the working tree.
    ///
    /// A rejected patch is reported as [`ApplyOutcome::Conflict`], not as an
    /// error. Only spawn failures surface as `Err`.
    ///
    /// Replaces: `git apply -v --whitespace=nowarn --recount --unidiff-zero [--3way]`.
    fn apply_patch(&self, patch: &Path, mode: ApplyMode) -> Result<ApplyOutcome, GitError>;

    // -----------------------------------------------------------------------
    // Stash
    // -----------------------------------------------------------------------

    /// Stash all changes including untracked files, keeping the index.
    ///
    /// Replaces: `git stash push --include-untracked --keep-index --message=<message>`.
    fn stash_push(&self, message: &str) -> Result<(), GitError>;

    /// The raw lines of `git stash list`, most recent first.
    fn stash_list(&self) -> Result<Vec<String>, GitError>;

    /// Re-apply a stash entry including its index state.
    ///
    /// Replaces: `git stash apply --quiet --index <name>`.
    fn stash_apply_index(&self, name: StashName) -> Result<(), GitError>;

    /// Drop a stash entry.
    ///
    /// Replaces: `git stash drop --quiet <name>`.
    fn stash_drop(&self, name: StashName) -> Result<(), GitError>;

    // -----------------------------------------------------------------------
    // Index
    // -----------------------------------------------------------------------

    /// Stage `paths`. An empty slice is a no-op.
    ///
    /// Replaces: `git add -- <paths>`.
    fn add(&self, paths: &[PathBuf]) -> Result<(), GitError>;

    /// Reset the index and working tree to `HEAD`.
    ///
    /// Replaces: `git reset --hard HEAD`.
    fn reset_hard(&self) -> Result<(), GitError>;
}
