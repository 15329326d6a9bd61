//! Creation, lookup and deletion of the backup snapshot.
//!
//! A snapshot is a stash entry pushed with `--include-untracked
//! --keep-index` plus two patches written into the common git directory:
//!
//! - the unstaged patch, a reverse diff from the post-stash working tree to
//!   the stashed working tree, and
//! - the untracked patch, the content of the stash's third parent, which git
//!   creates to hold untracked files.
//!
//! The stash entry is found by message, never cached by position, because
//! positions shift whenever anything else pushes or drops a stash.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use stagehand_git::{GitRepo, LsFilter, StashName};
use tracing::{debug, info, instrument, warn};

use crate::config::StagingSettings;
use crate::error::{Result, StagingError};
use crate::staging::merge_status::MergeStatus;
use crate::staging::staged;

/// File name of the unstaged-changes patch inside the common git directory.
pub const UNSTAGED_PATCH_FILE_NAME: &str = "stagehand_unstaged.patch";
/// File name of the untracked-files patch inside the common git directory.
pub const UNTRACKED_PATCH_FILE_NAME: &str = "stagehand_untracked.patch";

/// Parent of a `--include-untracked` stash commit that holds untracked files.
const UNTRACKED_PARENT: u8 = 3;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The pre-run state of the working copy. Created once per run, never
/// modified, and consumed by exactly one delete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    staged_files: Vec<PathBuf>,
    stash_message: String,
    unstaged_patch_file: PathBuf,
    untracked_patch_file: PathBuf,
}

impl Snapshot {
    /// Build a snapshot value. Used by [`save`] and by tests.
    #[must_use]
    pub const fn new(
        staged_files: Vec<PathBuf>,
        stash_message: String,
        unstaged_patch_file: PathBuf,
        untracked_patch_file: PathBuf,
    ) -> Self {
        Self {
            staged_files,
            stash_message,
            unstaged_patch_file,
            untracked_patch_file,
        }
    }

    /// Absolute paths staged for commit when the snapshot was taken.
    #[must_use]
    pub fn staged_files(&self) -> &[PathBuf] {
        &self.staged_files
    }

    /// Message identifying the backup stash entry.
    #[must_use]
    pub fn stash_message(&self) -> &str {
        &self.stash_message
    }

    /// Patch holding the developer's unstaged edits to tracked files.
    #[must_use]
    pub fn unstaged_patch_file(&self) -> &Path {
        &self.unstaged_patch_file
    }

    /// Patch holding the developer's untracked files.
    #[must_use]
    pub fn untracked_patch_file(&self) -> &Path {
        &self.untracked_patch_file
    }
}

// ---------------------------------------------------------------------------
// Preconditions
// ---------------------------------------------------------------------------

/// Check that every scratch directory that exists and has content is
/// ignored by git.
///
/// Restoring a snapshot rewrites the working tree, which would fail on files
/// a running build tool holds open. An ignored directory is left alone by
/// both the stash and the reset.
///
/// # Errors
/// Returns [`StagingError::Configuration`] naming the first offending
/// directory. Nothing in the repository is touched in that case.
#[instrument(skip_all)]
pub fn check_scratch_dirs(repo: &dyn GitRepo, scratch_dirs: &[PathBuf]) -> Result<()> {
    let mut present = Vec::new();
    for dir in scratch_dirs {
        if has_entries(&repo.top_level().join(dir))? {
            present.push(dir);
        } else {
            debug!(dir = %dir.display(), "scratch directory absent or empty, skipping");
        }
    }
    if present.is_empty() {
        return Ok(());
    }

    let status = repo.status(true)?;
    for dir in present {
        let ignored = status
            .lines()
            .iter()
            .any(|line| line.is_ignored() && dir.starts_with(&line.path));
        if !ignored {
            return Err(StagingError::Configuration {
                message: format!("scratch directory '{}' is not ignored by git", dir.display()),
                hint: format!("add '{}/' to .gitignore", dir.display()),
            });
        }
    }
    Ok(())
}

fn has_entries(dir: &Path) -> Result<bool> {
    match fs::read_dir(dir) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
            Ok(false)
        }
        Err(e) => Err(StagingError::io(dir, e)),
    }
}

// ---------------------------------------------------------------------------
// Stash lookup
// ---------------------------------------------------------------------------

/// Resolve the stash entry whose description contains `message`.
///
/// The first match wins. Right after a push that is the new entry, since
/// git lists the most recent stash first.
///
/// # Errors
/// Returns [`StagingError::BackupMissing`] if no entry matches.
pub fn find_stash(repo: &dyn GitRepo, message: &str) -> Result<StashName> {
    let list = repo.stash_list()?;
    let mut matches = list
        .iter()
        .enumerate()
        .filter(|(_, line)| line.contains(message))
        .map(|(i, _)| i);
    let index = matches.next().ok_or_else(|| StagingError::BackupMissing {
        message: message.to_owned(),
    })?;
    let extra = matches.count();
    if extra > 0 {
        warn!(
            backup = message,
            extra,
            "several stash entries share the backup message, using the newest"
        );
    }
    Ok(StashName::new(index))
}

// ---------------------------------------------------------------------------
// Save / delete
// ---------------------------------------------------------------------------

/// Take the backup snapshot.
///
/// On error no snapshot exists as far as the caller is concerned and tasks
/// must not run. A stash entry pushed before the failure is left in place.
///
/// # Errors
/// Returns [`StagingError::Configuration`] if a scratch directory is not
/// ignored, or any git or I/O error raised along the way.
#[instrument(skip_all, fields(backup = %settings.stash_message))]
pub fn save(repo: &dyn GitRepo, settings: &StagingSettings) -> Result<Snapshot> {
    check_scratch_dirs(repo, &settings.scratch_dirs)?;

    let common_dir = repo.common_dir();
    let staged_files = staged::staged_files(repo)?;
    let deleted_files = repo.ls_files(LsFilter::Deleted)?;
    let message = settings.stash_message.clone();

    if repo.stash_list()?.iter().any(|line| line.contains(&message)) {
        warn!(backup = %message, "a stash entry from an earlier run is still present");
    }

    MergeStatus::preserve(common_dir, || Ok(repo.stash_push(&message)?))?;

    // The stash checks out the index, which brings back files deleted only
    // in the working tree.
    for path in &deleted_files {
        remove_file_if_exists(path)?;
    }

    let stash = find_stash(repo, &message)?;

    let unstaged_patch_file = common_dir.join(UNSTAGED_PATCH_FILE_NAME);
    repo.diff_reverse_to_file(&stash.to_string(), &unstaged_patch_file)?;

    let untracked_patch_file = common_dir.join(UNTRACKED_PATCH_FILE_NAME);
    let untracked_rev = stash.parent(UNTRACKED_PARENT);
    if repo.rev_exists(&untracked_rev)? {
        repo.show_to_file(&untracked_rev, &untracked_patch_file)?;
    } else {
        fs::write(&untracked_patch_file, b"")
            .map_err(|e| StagingError::io(&untracked_patch_file, e))?;
    }

    info!(
        %stash,
        staged = staged_files.len(),
        deleted = deleted_files.len(),
        "snapshot saved"
    );
    Ok(Snapshot::new(
        staged_files,
        message,
        unstaged_patch_file,
        untracked_patch_file,
    ))
}

/// Remove both patch files (if present) and drop the backup stash entry.
///
/// # Errors
/// Returns [`StagingError::BackupMissing`] if the stash entry is gone, or
/// any git or I/O error.
#[instrument(skip_all, fields(backup = %snapshot.stash_message))]
pub fn delete(repo: &dyn GitRepo, snapshot: &Snapshot) -> Result<()> {
    remove_file_if_exists(&snapshot.unstaged_patch_file)?;
    remove_file_if_exists(&snapshot.untracked_patch_file)?;
    let stash = find_stash(repo, &snapshot.stash_message)?;
    repo.stash_drop(stash)?;
    info!(%stash, "snapshot deleted");
    Ok(())
}

fn remove_file_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StagingError::io(path, e)),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::fake::FakeRepo;
    use crate::staging::merge_status::MERGE_HEAD;
    use stagehand_git::{Status, StatusLine};

    fn ignored(path: &str) -> StatusLine {
        StatusLine {
            index: '!',
            worktree: '!',
            path: PathBuf::from(path),
        }
    }

    fn settings() -> StagingSettings {
        StagingSettings::default()
    }

    #[test]
    fn missing_scratch_dir_passes_without_status_query() {
        let repo = FakeRepo::new();
        check_scratch_dirs(&repo, &[PathBuf::from("target")]).unwrap();
        assert!(repo.calls().is_empty());
    }

    #[test]
    fn unignored_scratch_dir_is_configuration_error() {
        let repo = FakeRepo::new();
        repo.write_top_file("target/debug/out", b"x");
        let err = check_scratch_dirs(&repo, &[PathBuf::from("target")]).unwrap_err();
        assert!(matches!(err, StagingError::Configuration { .. }));
        assert!(err.to_string().contains("'target/'"));
    }

    #[test]
    fn ignored_scratch_dir_passes() {
        let repo = FakeRepo::new();
        repo.write_top_file("target/debug/out", b"x");
        repo.set_ignored_status(Status::new(vec![ignored("target/")]));
        check_scratch_dirs(&repo, &[PathBuf::from("target")]).unwrap();
    }

    #[test]
    fn scratch_dir_inside_ignored_parent_passes() {
        let repo = FakeRepo::new();
        repo.write_top_file("build/cache/blob", b"x");
        repo.set_ignored_status(Status::new(vec![ignored("build/")]));
        check_scratch_dirs(&repo, &[PathBuf::from("build/cache")]).unwrap();
    }

    #[test]
    fn find_stash_uses_first_matching_entry() {
        let repo = FakeRepo::new();
        repo.push_stash_entry("WIP on main: unrelated");
        repo.push_stash_entry("On main: stagehand backup");
        repo.push_stash_entry("On main: newer unrelated");
        assert_eq!(find_stash(&repo, "stagehand backup").unwrap(), StashName::new(1));
    }

    #[test]
    fn find_stash_reports_missing_backup() {
        let repo = FakeRepo::new();
        let err = find_stash(&repo, "stagehand backup").unwrap_err();
        assert!(matches!(err, StagingError::BackupMissing { .. }));
    }

    #[test]
    fn save_runs_commands_in_order() {
        let repo = FakeRepo::new();
        let a = repo.path("a.txt");
        repo.set_staged(vec![a.clone()]);
        repo.set_untracked_patch(Some(b"diff --git a/n b/n\n".to_vec()));

        let snapshot = save(&repo, &settings()).unwrap();

        assert_eq!(snapshot.staged_files(), &[a]);
        assert_eq!(snapshot.stash_message(), "stagehand backup");
        assert_eq!(
            snapshot.unstaged_patch_file(),
            repo.common_path(UNSTAGED_PATCH_FILE_NAME)
        );
        assert_eq!(
            repo.calls(),
            vec![
                "diff --staged".to_owned(),
                "ls-files --deleted".to_owned(),
                "stash list".to_owned(),
                "stash push stagehand backup".to_owned(),
                "stash list".to_owned(),
                "diff -R stash@{0}".to_owned(),
                "rev-parse stash@{0}^3".to_owned(),
                "show stash@{0}^3".to_owned(),
            ]
        );
        assert!(snapshot.untracked_patch_file().exists());
    }

    #[test]
    fn save_without_untracked_parent_writes_empty_patch() {
        let repo = FakeRepo::new();
        repo.set_staged(vec![repo.path("a.txt")]);
        let snapshot = save(&repo, &settings()).unwrap();
        assert!(!repo.calls().iter().any(|c| c.starts_with("show")));
        assert_eq!(fs::read(snapshot.untracked_patch_file()).unwrap(), b"");
    }

    #[test]
    fn save_re_deletes_working_tree_deletions() {
        let repo = FakeRepo::new();
        let gone = repo.path("gone.txt");
        repo.set_staged(vec![repo.path("a.txt")]);
        repo.set_deleted(vec![gone.clone()]);
        repo.restore_on_stash_push(gone.clone());

        save(&repo, &settings()).unwrap();
        assert!(!gone.exists());
    }

    #[test]
    fn save_preserves_merge_markers() {
        let repo = FakeRepo::new();
        repo.set_staged(vec![repo.path("a.txt")]);
        repo.write_common_file(MERGE_HEAD, b"feedface\n");

        save(&repo, &settings()).unwrap();
        assert_eq!(fs::read(repo.common_path(MERGE_HEAD)).unwrap(), b"feedface\n");
    }

    #[test]
    fn save_aborts_before_stash_when_scratch_dir_unignored() {
        let repo = FakeRepo::new();
        repo.set_staged(vec![repo.path("a.txt")]);
        repo.write_top_file("target/lock", b"x");
        assert!(save(&repo, &settings()).is_err());
        assert!(!repo.calls().iter().any(|c| c.starts_with("stash")));
    }

    #[test]
    fn delete_removes_patches_then_drops_stash() {
        let repo = FakeRepo::new();
        repo.set_staged(vec![repo.path("a.txt")]);
        let snapshot = save(&repo, &settings()).unwrap();
        repo.clear_calls();

        delete(&repo, &snapshot).unwrap();

        assert!(!snapshot.unstaged_patch_file().exists());
        assert!(!snapshot.untracked_patch_file().exists());
        assert_eq!(repo.calls(), vec!["stash list".to_owned(), "stash drop stash@{0}".to_owned()]);
        assert!(repo.stash_entries().is_empty());
    }

    #[test]
    fn delete_tolerates_missing_patch_files() {
        let repo = FakeRepo::new();
        repo.push_stash_entry("On main: stagehand backup");
        let snapshot = Snapshot::new(
            vec![],
            "stagehand backup".to_owned(),
            repo.common_path(UNSTAGED_PATCH_FILE_NAME),
            repo.common_path(UNTRACKED_PATCH_FILE_NAME),
        );
        delete(&repo, &snapshot).unwrap();
        assert!(repo.stash_entries().is_empty());
    }
}
