//! Core types for the stagehand git abstraction layer.
//!
//! These types form the vocabulary shared between the [`GitRepo`](crate::GitRepo)
//! trait and the staging engine. They contain no process or gix types; the
//! backend is an implementation detail.

use std::fmt;
use std::path::PathBuf;

use gix::bstr::ByteSlice;

use crate::error::GitError;

// ---------------------------------------------------------------------------
// StatusLine / Status
// ---------------------------------------------------------------------------

/// One entry of `git status --porcelain`.
///
/// The two status characters are the fixed-width `XY` pair: `index` is the
/// staged state, `worktree` the unstaged state. `path` is relative to the
/// repository top-level.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLine {
    /// Index (staged) status character, e.g. `M`, `A`, `D`, `?`, `!`, ` `.
    pub index: char,
    /// Working-tree status character.
    pub worktree: char,
    /// Path relative to the repository top-level.
    pub path: PathBuf,
}

impl StatusLine {
    /// Parse a single porcelain v1 record (`XY <path>`).
    ///
    /// The path is kept byte for byte; see
    /// [`Status::parse_porcelain_z`].
    ///
    /// # Errors
    /// Returns [`GitError::InvalidOutput`] if the record is shorter than the
    /// fixed `XY ` prefix plus one path byte, or the path cannot be
    /// represented on this platform.
    pub fn parse(record: &[u8]) -> Result<Self, GitError> {
        let [index, worktree, b' ', path @ ..] = record else {
            return Err(invalid_status(record));
        };
        if path.is_empty() || !index.is_ascii() || !worktree.is_ascii() {
            return Err(invalid_status(record));
        }
        let path = path.to_path().map_err(|_| invalid_status(record))?;
        Ok(Self {
            index: char::from(*index),
            worktree: char::from(*worktree),
            path: path.to_path_buf(),
        })
    }

    /// `true` for `!!` entries (present only with `--ignored`).
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        self.index == '!' && self.worktree == '!'
    }

    /// `true` for `??` entries.
    #[must_use]
    pub const fn is_untracked(&self) -> bool {
        self.index == '?' && self.worktree == '?'
    }

    /// `true` if the index status marks a rename or copy, whose porcelain
    /// record is followed by the original path.
    const fn has_origin_field(&self) -> bool {
        matches!(self.index, 'R' | 'C')
    }
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} {}", self.index, self.worktree, self.path.display())
    }
}

fn invalid_status(record: &[u8]) -> GitError {
    GitError::InvalidOutput {
        command: "git status --porcelain".to_owned(),
        message: format!("malformed status record {:?}", record.as_bstr()),
    }
}

/// The parsed output of `git status --porcelain -z`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Status {
    lines: Vec<StatusLine>,
}

impl Status {
    /// Build a status from already-parsed lines.
    #[must_use]
    pub const fn new(lines: Vec<StatusLine>) -> Self {
        Self { lines }
    }

    /// Parse NUL-separated porcelain v1 output.
    ///
    /// With `-z` git prints paths unquoted, so they are decoded from raw
    /// bytes rather than through a lossy UTF-8 conversion.
    ///
    /// Rename and copy records are followed by an extra NUL-terminated field
    /// holding the original path; that field is consumed and dropped.
    ///
    /// # Errors
    /// Returns [`GitError::InvalidOutput`] on malformed records.
    pub fn parse_porcelain_z(output: &[u8]) -> Result<Self, GitError> {
        let mut records = output.split(|b| *b == 0).filter(|r| !r.is_empty());
        let mut lines = Vec::new();
        while let Some(record) = records.next() {
            let line = StatusLine::parse(record)?;
            if line.has_origin_field() {
                records.next();
            }
            lines.push(line);
        }
        Ok(Self { lines })
    }

    /// `true` if there are no outstanding changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The parsed entries in git's output order.
    #[must_use]
    pub fn lines(&self) -> &[StatusLine] {
        &self.lines
    }
}

// ---------------------------------------------------------------------------
// StashName
// ---------------------------------------------------------------------------

/// A positional stash selector, `stash@{n}`.
///
/// Positions shift whenever the stash stack changes, so a `StashName` is only
/// meaningful until the next push or drop. Callers re-resolve it by message
/// before every use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StashName(usize);

impl StashName {
    /// The selector for position `index` in `git stash list`.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Position in the stash stack (0 is the most recent entry).
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }

    /// Revision naming the `n`-th parent of the stash commit, e.g.
    /// `stash@{0}^3` for the untracked-files parent.
    #[must_use]
    pub fn parent(self, n: u8) -> String {
        format!("{self}^{n}")
    }
}

impl fmt::Display for StashName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stash@{{{}}}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Patch application
// ---------------------------------------------------------------------------

/// How `git apply` should treat hunks that do not apply cleanly.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyMode {
    /// Plain application; any mismatch fails the whole patch.
    TwoWay,
    /// Fall back to a 3-way merge using the blob ancestry recorded in the patch.
    ThreeWay,
}

impl fmt::Display for ApplyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TwoWay => write!(f, "2-way"),
            Self::ThreeWay => write!(f, "3-way"),
        }
    }
}

/// Result of a single `git apply` attempt.
///
/// A rejected patch is an expected outcome, not an error: the caller decides
/// whether to retry in another [`ApplyMode`] or give up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The patch applied.
    Applied,
    /// git rejected the patch.
    Conflict {
        /// Captured stderr from `git apply`.
        stderr: String,
    },
}

impl ApplyOutcome {
    /// `true` if the patch applied.
    #[must_use]
    pub const fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

// ---------------------------------------------------------------------------
// ls-files
// ---------------------------------------------------------------------------

/// Which tracked files `git ls-files` should list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LsFilter {
    /// Tracked files missing from the working tree (`--deleted`).
    Deleted,
    /// Tracked files whose working-tree content differs from the index (`--modified`).
    Modified,
}

impl LsFilter {
    pub(crate) const fn flag(self) -> &'static str {
        match self {
            Self::Deleted => "--deleted",
            Self::Modified => "--modified",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
