//! In-memory [`GitRepo`] double that records every call.
//!
//! Layout and merge-marker files live in a real temporary directory, because
//! the engine reads and writes them directly. Everything else (staged files,
//! stash stack, apply outcomes) is scripted.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use stagehand_git::{ApplyMode, ApplyOutcome, GitError, GitRepo, LsFilter, StashName, Status};
use tempfile::TempDir;

use crate::staging::merge_status::{MERGE_HEAD, MERGE_MODE, MERGE_MSG};

#[derive(Default)]
struct State {
    calls: Vec<String>,
    staged: Vec<PathBuf>,
    deleted: Vec<PathBuf>,
    modified: Vec<PathBuf>,
    status: Status,
    ignored_status: Status,
    stash: Vec<String>,
    apply_outcomes: VecDeque<ApplyOutcome>,
    unstaged_patch: Vec<u8>,
    untracked_patch: Option<Vec<u8>>,
    restore_on_push: Vec<PathBuf>,
    failing: HashSet<&'static str>,
}

pub struct FakeRepo {
    _dir: TempDir,
    top: PathBuf,
    common: PathBuf,
    state: RefCell<State>,
}

impl FakeRepo {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let top = dir.path().join("work");
        let common = top.join(".git");
        fs::create_dir_all(&common).unwrap();
        Self {
            _dir: dir,
            top,
            common,
            state: RefCell::new(State::default()),
        }
    }

    // --- paths -------------------------------------------------------------

    pub fn path(&self, rel: &str) -> PathBuf {
        self.top.join(rel)
    }

    pub fn common_path(&self, rel: &str) -> PathBuf {
        self.common.join(rel)
    }

    pub fn write_common_file(&self, rel: &str, contents: &[u8]) -> PathBuf {
        let path = self.common_path(rel);
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn write_top_file(&self, rel: &str, contents: &[u8]) -> PathBuf {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, contents).unwrap();
        path
    }

    fn rel(&self, path: &Path) -> String {
        path.strip_prefix(&self.top)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    // --- scripting ---------------------------------------------------------

    pub fn set_staged(&self, files: Vec<PathBuf>) {
        self.state.borrow_mut().staged = files;
    }

    pub fn set_deleted(&self, files: Vec<PathBuf>) {
        self.state.borrow_mut().deleted = files;
    }

    pub fn set_modified(&self, files: Vec<PathBuf>) {
        self.state.borrow_mut().modified = files;
    }

    pub fn set_status(&self, status: Status) {
        self.state.borrow_mut().status = status;
    }

    pub fn set_ignored_status(&self, status: Status) {
        self.state.borrow_mut().ignored_status = status;
    }

    pub fn set_unstaged_patch(&self, patch: Vec<u8>) {
        self.state.borrow_mut().unstaged_patch = patch;
    }

    /// `None` means the stash has no untracked-files parent.
    pub fn set_untracked_patch(&self, patch: Option<Vec<u8>>) {
        self.state.borrow_mut().untracked_patch = patch;
    }

    pub fn queue_apply(&self, outcome: ApplyOutcome) {
        self.state.borrow_mut().apply_outcomes.push_back(outcome);
    }

    /// Recreate `path` when the stash is pushed, as git does for files
    /// deleted only in the working tree.
    pub fn restore_on_stash_push(&self, path: PathBuf) {
        self.state.borrow_mut().restore_on_push.push(path);
    }

    /// Make the named operation fail with a command error.
    pub fn fail_on(&self, op: &'static str) {
        self.state.borrow_mut().failing.insert(op);
    }

    /// Push a raw entry description onto the stash stack (newest first).
    pub fn push_stash_entry(&self, description: &str) {
        self.state.borrow_mut().stash.insert(0, description.to_owned());
    }

    // --- inspection --------------------------------------------------------

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn stash_entries(&self) -> Vec<String> {
        self.state.borrow().stash.clone()
    }

    // --- internals ---------------------------------------------------------

    fn record(&self, op: &'static str, call: String) -> Result<(), GitError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(call.clone());
        if state.failing.contains(op) {
            return Err(GitError::CommandFailed {
                command: format!("git {call}"),
                exit_code: Some(1),
                stderr: format!("{op} failed"),
            });
        }
        Ok(())
    }

    fn clear_merge_markers(&self) {
        for name in [MERGE_HEAD, MERGE_MODE, MERGE_MSG] {
            let _ = fs::remove_file(self.common.join(name));
        }
    }

    fn stash_index(&self, name: StashName) -> Result<usize, GitError> {
        if name.index() < self.state.borrow().stash.len() {
            Ok(name.index())
        } else {
            Err(GitError::CommandFailed {
                command: format!("git stash {name}"),
                exit_code: Some(1),
                stderr: format!("{name} is not a valid reference"),
            })
        }
    }
}

impl GitRepo for FakeRepo {
    fn top_level(&self) -> &Path {
        &self.top
    }

    fn common_dir(&self) -> &Path {
        &self.common
    }

    fn status(&self, include_ignored: bool) -> Result<Status, GitError> {
        if include_ignored {
            self.record("status", "status --ignored".to_owned())?;
            Ok(self.state.borrow().ignored_status.clone())
        } else {
            self.record("status", "status".to_owned())?;
            Ok(self.state.borrow().status.clone())
        }
    }

    fn staged_files(&self) -> Result<Vec<PathBuf>, GitError> {
        self.record("staged_files", "diff --staged".to_owned())?;
        Ok(self.state.borrow().staged.clone())
    }

    fn ls_files(&self, filter: LsFilter) -> Result<Vec<PathBuf>, GitError> {
        let state_files = match filter {
            LsFilter::Deleted => {
                self.record("ls_files", "ls-files --deleted".to_owned())?;
                self.state.borrow().deleted.clone()
            }
            LsFilter::Modified => {
                self.record("ls_files", "ls-files --modified".to_owned())?;
                self.state.borrow().modified.clone()
            }
        };
        Ok(state_files)
    }

    fn diff_reverse_to_file(&self, rev: &str, out: &Path) -> Result<(), GitError> {
        self.record("diff", format!("diff -R {rev}"))?;
        fs::write(out, &self.state.borrow().unstaged_patch)?;
        Ok(())
    }

    fn show_to_file(&self, rev: &str, out: &Path) -> Result<(), GitError> {
        self.record("show", format!("show {rev}"))?;
        let contents = self.state.borrow().untracked_patch.clone().unwrap_or_default();
        fs::write(out, contents)?;
        Ok(())
    }

    fn rev_exists(&self, rev: &str) -> Result<bool, GitError> {
        self.record("rev_exists", format!("rev-parse {rev}"))?;
        let state = self.state.borrow();
        Ok(!state.stash.is_empty() && state.untracked_patch.is_some())
    }

    fn apply_patch(&self, patch: &Path, mode: ApplyMode) -> Result<ApplyOutcome, GitError> {
        let name = patch
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.record("apply", format!("apply {mode} {name}"))?;
        Ok(self
            .state
            .borrow_mut()
            .apply_outcomes
            .pop_front()
            .unwrap_or(ApplyOutcome::Applied))
    }

    fn stash_push(&self, message: &str) -> Result<(), GitError> {
        self.record("stash_push", format!("stash push {message}"))?;
        self.clear_merge_markers();
        let restore = self.state.borrow().restore_on_push.clone();
        for path in restore {
            fs::write(path, b"restored by stash\n")?;
        }
        self.push_stash_entry(&format!("On main: {message}"));
        Ok(())
    }

    fn stash_list(&self) -> Result<Vec<String>, GitError> {
        self.record("stash_list", "stash list".to_owned())?;
        Ok(self
            .state
            .borrow()
            .stash
            .iter()
            .enumerate()
            .map(|(i, desc)| format!("{}: {desc}", StashName::new(i)))
            .collect())
    }

    fn stash_apply_index(&self, name: StashName) -> Result<(), GitError> {
        self.record("stash_apply_index", format!("stash apply {name}"))?;
        self.stash_index(name)?;
        Ok(())
    }

    fn stash_drop(&self, name: StashName) -> Result<(), GitError> {
        self.record("stash_drop", format!("stash drop {name}"))?;
        let index = self.stash_index(name)?;
        self.state.borrow_mut().stash.remove(index);
        Ok(())
    }

    fn add(&self, paths: &[PathBuf]) -> Result<(), GitError> {
        let rendered: Vec<String> = paths.iter().map(|p| self.rel(p)).collect();
        self.record("add", format!("add {}", rendered.join(" ")))
    }

    fn reset_hard(&self) -> Result<(), GitError> {
        self.record("reset_hard", "reset --hard".to_owned())?;
        self.clear_merge_markers();
        Ok(())
    }
}
