//! Shared test helpers for stagehand integration tests.
//!
//! All tests use temp directories, with no side effects on the real repo.
//! Each test gets its own git repository via [`TestRepo::new`].

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use stagehand_git::{CliRepo, GitRepo, Status, StatusLine};
use tempfile::TempDir;

/// A throw-away git repository with one initial commit.
pub struct TestRepo {
    _dir: TempDir,
    repo: CliRepo,
}

impl TestRepo {
    /// Fresh repository containing a committed `.gitignore` that ignores
    /// `target/`.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        git_in(dir.path(), &["init", "--quiet"]);
        git_in(dir.path(), &["config", "user.email", "test@test.com"]);
        git_in(dir.path(), &["config", "user.name", "Test User"]);
        git_in(dir.path(), &["config", "commit.gpgsign", "false"]);
        git_in(dir.path(), &["config", "core.autocrlf", "false"]);
        fs::write(dir.path().join(".gitignore"), "target/\n").unwrap();
        git_in(dir.path(), &["add", ".gitignore"]);
        git_in(dir.path(), &["commit", "--quiet", "-m", "initial commit"]);
        let repo = CliRepo::open(dir.path()).expect("failed to open test repo");
        Self { _dir: dir, repo }
    }

    pub const fn repo(&self) -> &CliRepo {
        &self.repo
    }

    pub fn root(&self) -> &Path {
        self.repo.top_level()
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root().join(rel)
    }

    pub fn write(&self, rel: &str, contents: &str) {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.path(rel)).unwrap()
    }

    pub fn delete(&self, rel: &str) {
        fs::remove_file(self.path(rel)).unwrap();
    }

    /// Run git in the repository root, asserting success. Returns stdout.
    pub fn git(&self, args: &[&str]) -> String {
        git_in(self.root(), args)
    }

    /// Commit `count` empty files named from `pattern` (`{}` → 1..=count).
    pub fn commit_empty_files(&self, pattern: &str, count: usize) {
        for i in 1..=count {
            self.write(&pattern.replace("{}", &i.to_string()), "");
        }
        self.git(&["add", "."]);
        self.git(&["commit", "--quiet", "-m", "add files"]);
    }

    pub fn commit_file(&self, rel: &str, contents: &str) {
        self.write(rel, contents);
        self.git(&["add", rel]);
        self.git(&["commit", "--quiet", "-m", &format!("add {rel}")]);
    }

    pub fn status(&self) -> Status {
        self.repo.status(false).unwrap()
    }

    pub fn status_of(&self, rel: &str) -> Option<StatusLine> {
        let rel = Path::new(rel);
        self.status().lines().iter().find(|line| line.path == rel).cloned()
    }

    /// `(index, worktree)` status codes, or `None` when the file is clean.
    pub fn codes(&self, rel: &str) -> Option<(char, char)> {
        self.status_of(rel).map(|l| (l.index, l.worktree))
    }

    /// Content of `rel` in the index.
    pub fn staged_content(&self, rel: &str) -> String {
        self.git(&["show", &format!(":{rel}")])
    }

    pub fn stash_list(&self) -> String {
        self.git(&["stash", "list"])
    }

    pub fn git_dir(&self) -> PathBuf {
        self.repo.common_dir().to_path_buf()
    }

    /// Run the `stagehand` binary in the repository root.
    pub fn stagehand(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_stagehand"))
            .args(args)
            .current_dir(self.root())
            .env_remove("RUST_LOG")
            .env_remove("STAGEHAND_CONFIG")
            .output()
            .expect("failed to run stagehand")
    }
}

pub fn git_in(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        out.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&out.stderr)
    );
    String::from_utf8_lossy(&out.stdout).into_owned()
}

/// stdout + stderr, for assertion messages.
pub fn output_text(out: &Output) -> String {
    format!(
        "stdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    )
}
