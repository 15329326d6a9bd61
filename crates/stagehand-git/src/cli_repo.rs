//! The git-CLI-backed implementation of [`GitRepo`].
//!
//! Repository layout is discovered once with gix; every operation after that
//! shells out to the `git` binary with the working tree root as its current
//! directory.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use gix::bstr::ByteSlice;
use tracing::debug;

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::{ApplyMode, ApplyOutcome, LsFilter, StashName, Status};

/// A [`GitRepo`] implementation that drives the `git` binary.
///
/// Construct via [`CliRepo::open`].
#[derive(Clone, Debug)]
pub struct CliRepo {
    top_level: PathBuf,
    common_dir: PathBuf,
}

impl CliRepo {
    /// Open the repository containing `path`, searching parent directories.
    ///
    /// # Errors
    /// Returns [`GitError::Discovery`] if `path` is not inside a repository
    /// or the repository is bare.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let start = std::fs::canonicalize(path)?;
        let repo = gix::discover(&start).map_err(|e| GitError::Discovery {
            message: format!("{}: {e}", start.display()),
        })?;
        let workdir = repo.workdir().ok_or_else(|| GitError::Discovery {
            message: format!("{}: repository has no working tree", start.display()),
        })?;
        let top_level = std::fs::canonicalize(absolutize(&start, workdir))?;
        let common_dir = std::fs::canonicalize(absolutize(&top_level, repo.common_dir()))?;
        debug!(
            top_level = %top_level.display(),
            common_dir = %common_dir.display(),
            "discovered repository"
        );
        Ok(Self {
            top_level,
            common_dir,
        })
    }

    /// Build a repository handle from already-known directories.
    #[must_use]
    pub const fn from_parts(top_level: PathBuf, common_dir: PathBuf) -> Self {
        Self {
            top_level,
            common_dir,
        }
    }

    // -----------------------------------------------------------------------
    // Command plumbing
    // -----------------------------------------------------------------------

    /// Run git and return its raw output regardless of exit status.
    pub(crate) fn output<I, S>(&self, args: I) -> Result<(String, Output), GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args.into_iter().map(|a| a.as_ref().to_owned()).collect();
        let command = render_command(&args);
        debug!(%command, "running git");
        let output = Command::new("git")
            .args(&args)
            .current_dir(&self.top_level)
            .output()?;
        Ok((command, output))
    }

    /// Run git, mapping a non-zero exit to [`GitError::CommandFailed`], and
    /// return stdout.
    pub(crate) fn run<I, S>(&self, args: I) -> Result<Vec<u8>, GitError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let (command, output) = self.output(args)?;
        if output.status.success() {
            return Ok(output.stdout);
        }
        Err(GitError::CommandFailed {
            command,
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }

    /// Resolve NUL-separated paths from a name-listing command against the
    /// working tree root.
    ///
    /// Paths are taken as raw bytes; on unix any byte sequence is a valid
    /// path, elsewhere a path that is not UTF-8 is an error.
    pub(crate) fn resolve_z_paths(&self, stdout: &[u8]) -> Result<Vec<PathBuf>, GitError> {
        stdout
            .split(|b| *b == 0)
            .filter(|p| !p.is_empty())
            .map(|p| {
                let rel = p.to_path().map_err(|_| GitError::InvalidOutput {
                    command: "git ls-files -z".to_owned(),
                    message: format!("path {:?} is not valid on this platform", p.as_bstr()),
                })?;
                Ok(self.top_level.join(rel))
            })
            .collect()
    }
}

fn absolutize(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn render_command(args: &[OsString]) -> String {
    let mut command = String::from("git");
    for arg in args {
        command.push(' ');
        command.push_str(&arg.to_string_lossy());
    }
    command
}

impl GitRepo for CliRepo {
    // === Layout ===
    fn top_level(&self) -> &Path {
        &self.top_level
    }

    fn common_dir(&self) -> &Path {
        &self.common_dir
    }

    // === Status ===
    fn status(&self, include_ignored: bool) -> Result<Status, GitError> {
        crate::status_impl::status(self, include_ignored)
    }

    fn staged_files(&self) -> Result<Vec<PathBuf>, GitError> {
        crate::status_impl::staged_files(self)
    }

    fn ls_files(&self, filter: LsFilter) -> Result<Vec<PathBuf>, GitError> {
        crate::index_impl::ls_files(self, filter)
    }

    // === Diff ===
    fn diff_reverse_to_file(&self, rev: &str, out: &Path) -> Result<(), GitError> {
        crate::diff_impl::diff_reverse_to_file(self, rev, out)
    }

    fn show_to_file(&self, rev: &str, out: &Path) -> Result<(), GitError> {
        crate::diff_impl::show_to_file(self, rev, out)
    }

    fn rev_exists(&self, rev: &str) -> Result<bool, GitError> {
        crate::diff_impl::rev_exists(self, rev)
    }

    // === Apply ===
    fn apply_patch(&self, patch: &Path, mode: ApplyMode) -> Result<ApplyOutcome, GitError> {
        crate::diff_impl::apply_patch(self, patch, mode)
    }

    // === Stash ===
    fn stash_push(&self, message: &str) -> Result<(), GitError> {
        crate::stash_impl::stash_push(self, message)
    }

    fn stash_list(&self) -> Result<Vec<String>, GitError> {
        crate::stash_impl::stash_list(self)
    }

    fn stash_apply_index(&self, name: StashName) -> Result<(), GitError> {
        crate::stash_impl::stash_apply_index(self, name)
    }

    fn stash_drop(&self, name: StashName) -> Result<(), GitError> {
        crate::stash_impl::stash_drop(self, name)
    }

    // === Index ===
    fn add(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        crate::index_impl::add(self, paths)
    }

    fn reset_hard(&self) -> Result<(), GitError> {
        crate::index_impl::reset_hard(self)
    }
}
