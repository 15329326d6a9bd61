//! Git hook installation.
//!
//! For a configured pre-commit hook the layout after [`HookInstaller::apply`] is:
//!
//! ```text
//! .git/
//! `-- hooks/
//!     |-- pre-commit            <- existing hook, with one line spliced in
//!     `-- stagehand/
//!         `-- pre-commit        <- generated script holding the configured body
//! ```
//!
//! The top-level hook file only gains an invocation line for the generated
//! script, so hooks installed by other tools keep working as long as they are
//! shell scripts. Applying is idempotent, and removing a hook strips exactly
//! the line that was added.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, StagingError};

/// Shebang written to hook files that stagehand creates.
const HOOK_SHEBANG: &str = "#!/bin/sh -";

/// Directory under `hooks/` holding the generated scripts.
const SCRIPTS_DIR: &str = "stagehand";

// ---------------------------------------------------------------------------
// GitHook
// ---------------------------------------------------------------------------

/// The client- and server-side hooks git knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GitHook {
    ApplypatchMsg,
    PreApplypatch,
    PostApplypatch,
    PreCommit,
    PreMergeCommit,
    PrepareCommitMsg,
    CommitMsg,
    PostCommit,
    PreRebase,
    PostCheckout,
    PostMerge,
    PrePush,
    PreReceive,
    Update,
    PostReceive,
    PostUpdate,
    PushToCheckout,
    PreAutoGc,
    PostRewrite,
    SendemailValidate,
}

impl GitHook {
    /// Every hook, in git's documentation order.
    pub const ALL: [Self; 20] = [
        Self::ApplypatchMsg,
        Self::PreApplypatch,
        Self::PostApplypatch,
        Self::PreCommit,
        Self::PreMergeCommit,
        Self::PrepareCommitMsg,
        Self::CommitMsg,
        Self::PostCommit,
        Self::PreRebase,
        Self::PostCheckout,
        Self::PostMerge,
        Self::PrePush,
        Self::PreReceive,
        Self::Update,
        Self::PostReceive,
        Self::PostUpdate,
        Self::PushToCheckout,
        Self::PreAutoGc,
        Self::PostRewrite,
        Self::SendemailValidate,
    ];

    /// The file name git looks for under `hooks/`.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::ApplypatchMsg => "applypatch-msg",
            Self::PreApplypatch => "pre-applypatch",
            Self::PostApplypatch => "post-applypatch",
            Self::PreCommit => "pre-commit",
            Self::PreMergeCommit => "pre-merge-commit",
            Self::PrepareCommitMsg => "prepare-commit-msg",
            Self::CommitMsg => "commit-msg",
            Self::PostCommit => "post-commit",
            Self::PreRebase => "pre-rebase",
            Self::PostCheckout => "post-checkout",
            Self::PostMerge => "post-merge",
            Self::PrePush => "pre-push",
            Self::PreReceive => "pre-receive",
            Self::Update => "update",
            Self::PostReceive => "post-receive",
            Self::PostUpdate => "post-update",
            Self::PushToCheckout => "push-to-checkout",
            Self::PreAutoGc => "pre-auto-gc",
            Self::PostRewrite => "post-rewrite",
            Self::SendemailValidate => "sendemail-validate",
        }
    }
}

impl fmt::Display for GitHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

// ---------------------------------------------------------------------------
// HookInstaller
// ---------------------------------------------------------------------------

/// Adds and removes stagehand-managed hooks in one hooks directory.
#[derive(Clone, Debug)]
pub struct HookInstaller {
    hooks_dir: PathBuf,
}

impl HookInstaller {
    /// An installer for `<common_dir>/hooks`.
    #[must_use]
    pub fn for_common_dir(common_dir: &Path) -> Self {
        Self::new(common_dir.join("hooks"))
    }

    /// An installer for an explicit hooks directory.
    #[must_use]
    pub const fn new(hooks_dir: PathBuf) -> Self {
        Self { hooks_dir }
    }

    /// The hooks directory being managed.
    #[must_use]
    pub fn hooks_dir(&self) -> &Path {
        &self.hooks_dir
    }

    fn scripts_dir(&self) -> PathBuf {
        self.hooks_dir.join(SCRIPTS_DIR)
    }

    fn script_path(&self, hook: GitHook) -> PathBuf {
        self.scripts_dir().join(hook.file_name())
    }

    fn hook_path(&self, hook: GitHook) -> PathBuf {
        self.hooks_dir.join(hook.file_name())
    }

    fn invocation(&self, hook: GitHook) -> String {
        format!("\n\n{}", self.script_path(hook).display())
    }

    /// Make the hooks directory match `scripts`.
    ///
    /// Every hook with a non-empty script gets a generated script and an
    /// invocation line in its hook file. Every other hook has its generated
    /// script and invocation line removed.
    ///
    /// # Errors
    /// Returns [`StagingError::Io`] if a hook file cannot be read or written.
    #[instrument(skip_all, fields(hooks_dir = %self.hooks_dir.display()))]
    pub fn apply(&self, scripts: &BTreeMap<GitHook, String>, now: DateTime<Local>) -> Result<()> {
        let configured: BTreeMap<GitHook, &str> = scripts
            .iter()
            .filter(|(_, body)| !body.trim().is_empty())
            .map(|(hook, body)| (*hook, body.as_str()))
            .collect();

        if !configured.is_empty() {
            let dir = self.scripts_dir();
            fs::create_dir_all(&dir).map_err(|e| StagingError::io(&dir, e))?;
        }

        for (hook, body) in &configured {
            self.write_script(*hook, body, now)?;
            self.splice(*hook)?;
        }
        for hook in GitHook::ALL {
            if !configured.contains_key(&hook) {
                self.unsplice(hook)?;
                remove_if_exists(&self.script_path(hook))?;
            }
        }
        self.clean_scripts_dir()?;

        info!(hooks = configured.len(), "hooks applied");
        Ok(())
    }

    /// Remove every stagehand-managed hook.
    ///
    /// # Errors
    /// Returns [`StagingError::Io`] if a hook file cannot be read or written.
    pub fn remove_all(&self) -> Result<()> {
        self.apply(&BTreeMap::new(), Local::now())
    }

    fn write_script(&self, hook: GitHook, body: &str, now: DateTime<Local>) -> Result<()> {
        let path = self.script_path(hook);
        let contents = render_script(hook, body, now);
        fs::write(&path, contents).map_err(|e| StagingError::io(&path, e))?;
        make_executable(&path);
        debug!(%hook, path = %path.display(), "wrote hook script");
        Ok(())
    }

    fn splice(&self, hook: GitHook) -> Result<()> {
        let path = self.hook_path(hook);
        let current = read_trimmed(&path)?.unwrap_or_else(|| HOOK_SHEBANG.to_owned());
        let invocation = self.invocation(hook);
        if current.contains(&invocation) {
            return Ok(());
        }
        let updated = current + &invocation;
        fs::write(&path, updated).map_err(|e| StagingError::io(&path, e))?;
        make_executable(&path);
        debug!(%hook, "spliced hook invocation");
        Ok(())
    }

    fn unsplice(&self, hook: GitHook) -> Result<()> {
        let path = self.hook_path(hook);
        let Some(current) = read_trimmed(&path)? else {
            return Ok(());
        };
        let invocation = self.invocation(hook);
        if !current.contains(&invocation) {
            return Ok(());
        }
        let updated = current.replace(&invocation, "");
        if updated == HOOK_SHEBANG {
            fs::remove_file(&path).map_err(|e| StagingError::io(&path, e))?;
            debug!(%hook, "removed hook file");
        } else {
            fs::write(&path, updated).map_err(|e| StagingError::io(&path, e))?;
            make_executable(&path);
            debug!(%hook, "stripped hook invocation");
        }
        Ok(())
    }

    fn clean_scripts_dir(&self) -> Result<()> {
        let dir = self.scripts_dir();
        let mut entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StagingError::io(&dir, e)),
        };
        if entries.next().is_none() {
            fs::remove_dir(&dir).map_err(|e| StagingError::io(&dir, e))?;
        }
        Ok(())
    }
}

fn render_script(hook: GitHook, body: &str, now: DateTime<Local>) -> String {
    format!(
        "#!/bin/sh\n\
         #\n\
         # {hook} hook generated by stagehand on {}.\n\
         # Edit stagehand.toml and run `stagehand hooks apply` instead of changing this file.\n\
         \n\
         {}\n",
        now.format("%b %-d, %Y %I:%M %p %Z"),
        body.trim_end()
    )
}

fn read_trimmed(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(Some(s.trim().to_owned())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StagingError::io(path, e)),
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StagingError::io(path, e)),
    }
}

#[cfg(unix)]
fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt as _;

    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o744)) {
        warn!(path = %path.display(), error = %e, "could not set hook permissions");
    }
}

#[cfg(not(unix))]
fn make_executable(path: &Path) {
    debug!(path = %path.display(), "file permissions unsupported, skipping");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
