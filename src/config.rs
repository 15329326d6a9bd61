//! Repository configuration (`stagehand.toml`).
//!
//! Defines the typed configuration read from `stagehand.toml` at the
//! repository top-level: staging-engine settings, the tasks to run against
//! staged files, and the git hooks to install.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::hooks::GitHook;
use crate::platform::MaxCommandLength;

/// File name of the configuration file, relative to the repository top-level.
pub const CONFIG_FILE_NAME: &str = "stagehand.toml";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level stagehand configuration.
///
/// Missing fields use sensible defaults. Missing file → all defaults (no error).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StagehandConfig {
    /// Staging-engine settings.
    #[serde(default)]
    pub staging: StagingConfig,

    /// Tasks run against the staged files, in order.
    #[serde(default, rename = "task")]
    pub tasks: Vec<TaskConfig>,

    /// Git hook installation.
    #[serde(default)]
    pub hooks: HooksConfig,
}

// ---------------------------------------------------------------------------
// StagingConfig
// ---------------------------------------------------------------------------

/// Settings for the snapshot/restore engine.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StagingConfig {
    /// Directories, relative to the top-level, that tools write into while
    /// tasks run. Each one that exists must be ignored by git, because a
    /// restore would otherwise try to overwrite files that may be locked.
    #[serde(default = "default_scratch_dirs")]
    pub scratch_dirs: Vec<PathBuf>,

    /// Override for the host command-line length limit used to batch
    /// `git add` invocations.
    #[serde(default)]
    pub max_command_length: Option<usize>,

    /// Message identifying the backup stash entry.
    #[serde(default = "default_stash_message")]
    pub stash_message: String,
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            scratch_dirs: default_scratch_dirs(),
            max_command_length: None,
            stash_message: default_stash_message(),
        }
    }
}

fn default_scratch_dirs() -> Vec<PathBuf> {
    vec![PathBuf::from("target")]
}

fn default_stash_message() -> String {
    "stagehand backup".to_owned()
}

impl StagingConfig {
    /// Resolve into the runtime settings handed to the engine.
    #[must_use]
    pub fn settings(&self) -> StagingSettings {
        StagingSettings {
            scratch_dirs: self.scratch_dirs.clone(),
            max_command_length: MaxCommandLength::resolve(self.max_command_length),
            stash_message: self.stash_message.clone(),
        }
    }
}

/// Resolved engine settings for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagingSettings {
    /// Scratch directories that must be ignored when present.
    pub scratch_dirs: Vec<PathBuf>,
    /// Command-line length limit for `git add` batching.
    pub max_command_length: MaxCommandLength,
    /// Backup stash message.
    pub stash_message: String,
}

impl Default for StagingSettings {
    fn default() -> Self {
        StagingConfig::default().settings()
    }
}

// ---------------------------------------------------------------------------
// TaskConfig
// ---------------------------------------------------------------------------

/// A command run against the staged files.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Display name used in logs.
    pub name: String,

    /// Program and arguments. Not passed through a shell.
    pub command: Vec<String>,

    /// Glob patterns selecting which staged files this task cares about.
    /// Empty means all staged files.
    #[serde(default)]
    pub glob: Vec<String>,

    /// Append the selected staged paths to the command line.
    #[serde(default)]
    pub pass_files: bool,
}

// ---------------------------------------------------------------------------
// HooksConfig
// ---------------------------------------------------------------------------

/// Git hooks managed by stagehand.
///
/// ```toml
/// [hooks]
/// auto_apply = true
/// pre-commit = "stagehand run"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct HooksConfig {
    /// Install the configured hooks at the start of every `stagehand run`.
    #[serde(default)]
    pub auto_apply: bool,

    /// Hook name → shell script body. Unknown hook names are rejected.
    #[serde(flatten)]
    pub scripts: BTreeMap<GitHook, String>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Error loading a stagehand configuration file.
#[derive(Debug)]
pub struct ConfigError {
    /// The path that was being loaded (if available).
    pub path: Option<PathBuf>,
    /// Human-readable message with line-level detail when possible.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(p) = &self.path {
            write!(f, "{}: {}", p.display(), self.message)
        } else {
            write!(f, "config error: {}", self.message)
        }
    }
}

impl std::error::Error for ConfigError {}

impl StagehandConfig {
    /// Load `stagehand.toml` from the repository top-level.
    ///
    /// # Errors
    /// See [`StagehandConfig::load`].
    pub fn load_from_repo(top_level: &Path) -> Result<Self, ConfigError> {
        Self::load(&top_level.join(CONFIG_FILE_NAME))
    }

    /// Load configuration from a TOML file.
    ///
    /// - If the file does not exist, returns all defaults (not an error).
    /// - If the file exists but contains invalid TOML or unknown fields,
    ///   returns a [`ConfigError`] with line-level detail.
    ///
    /// # Errors
    /// Returns `ConfigError` on I/O errors (other than not-found) or parse errors.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError {
                    path: Some(path.to_owned()),
                    message: format!("could not read file: {e}"),
                });
            }
        };
        Self::parse(&contents).map_err(|mut e| {
            e.path = Some(path.to_owned());
            e
        })
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `ConfigError` on invalid TOML, unknown fields, or a task
    /// with an empty command.
    pub fn parse(toml_str: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            let mut message = e.message().to_owned();
            if let Some(span) = e.span() {
                let line = toml_str[..span.start]
                    .chars()
                    .filter(|&c| c == '\n')
                    .count()
                    + 1;
                message = format!("line {line}: {message}");
            }
            ConfigError {
                path: None,
                message,
            }
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(task) = self.tasks.iter().find(|t| t.command.is_empty()) {
            return Err(ConfigError {
                path: None,
                message: format!("task '{}' has an empty command", task.name),
            });
        }
        if self.staging.stash_message.trim().is_empty() {
            return Err(ConfigError {
                path: None,
                message: "staging.stash_message must not be empty".to_owned(),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
