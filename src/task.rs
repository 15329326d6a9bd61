//! Execution of the tasks that run against the staged files.
//!
//! Tasks run one after another from the repository top-level, after the
//! snapshot is saved. The first failure stops the run.
//!
//! A task that takes its files as arguments is invoked once per batch, so
//! no single command line outgrows [`MaxCommandLength`].

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

use glob::Pattern;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::config::TaskConfig;
use crate::platform::MaxCommandLength;
use crate::staging::restage::plan_batches;

/// Environment variable holding the staged files, one absolute path per line.
pub const STAGED_FILES_ENV: &str = "STAGEHAND_STAGED_FILES";

// ---------------------------------------------------------------------------
// TaskError
// ---------------------------------------------------------------------------

/// Errors from preparing or running tasks.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A task's glob pattern does not parse.
    #[error("task '{task}': invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        /// Task name.
        task: String,
        /// The offending pattern.
        pattern: String,
        /// Parser error.
        #[source]
        source: glob::PatternError,
    },

    /// The task's program could not be started.
    #[error("task '{task}': could not start `{program}`: {source}")]
    Spawn {
        /// Task name.
        task: String,
        /// Program that failed to start.
        program: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The task exited unsuccessfully.
    #[error("task '{task}' failed ({})", describe_exit(*exit_code))]
    Failed {
        /// Task name.
        task: String,
        /// Exit code, or `None` if killed by a signal.
        exit_code: Option<i32>,
    },
}

fn describe_exit(code: Option<i32>) -> String {
    code.map_or_else(|| "killed by signal".to_owned(), |c| format!("exit code {c}"))
}

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A prepared task: command plus compiled file filter.
#[derive(Clone, Debug)]
pub struct Task {
    name: String,
    command: Vec<String>,
    patterns: Vec<Pattern>,
    pass_files: bool,
}

impl Task {
    /// Compile a configured task.
    ///
    /// # Errors
    /// Returns [`TaskError::InvalidGlob`] if a pattern does not parse.
    pub fn from_config(config: &TaskConfig) -> Result<Self, TaskError> {
        let patterns = config
            .glob
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| TaskError::InvalidGlob {
                    task: config.name.clone(),
                    pattern: p.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: config.name.clone(),
            command: config.command.clone(),
            patterns,
            pass_files: config.pass_files,
        })
    }

    /// A one-off command given on the command line. It sees every staged
    /// file through the environment and gets no file arguments.
    #[must_use]
    pub fn ad_hoc(command: Vec<String>) -> Self {
        let name = command.first().cloned().unwrap_or_default();
        Self {
            name,
            command,
            patterns: Vec::new(),
            pass_files: false,
        }
    }

    /// Task name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Staged files this task applies to. Patterns match against the path
    /// relative to `top_level`; no patterns selects everything.
    #[must_use]
    pub fn select_files<'a>(&self, staged: &'a [PathBuf], top_level: &Path) -> Vec<&'a PathBuf> {
        if self.patterns.is_empty() {
            return staged.iter().collect();
        }
        staged
            .iter()
            .filter(|path| {
                let rel = path.strip_prefix(top_level).unwrap_or(path);
                self.patterns.iter().any(|p| p.matches_path(rel))
            })
            .collect()
    }

    fn base_command(&self, staged: &[PathBuf], top_level: &Path) -> Command {
        let (program, args) = self
            .command
            .split_first()
            .map_or(("", &[][..]), |(p, a)| (p.as_str(), a));
        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(top_level).env(STAGED_FILES_ENV, join_lines(staged));
        cmd
    }

    /// The invocations for this task: one without file arguments, or one
    /// per batch of `selected` sized against `max` minus the length of the
    /// command itself.
    fn build_commands(
        &self,
        staged: &[PathBuf],
        selected: &[PathBuf],
        top_level: &Path,
        max: MaxCommandLength,
    ) -> Vec<Command> {
        if !self.pass_files || selected.is_empty() {
            return vec![self.base_command(staged, top_level)];
        }
        let command_len = self.command.iter().map(|a| a.len() + 1).sum::<usize>();
        let budget = MaxCommandLength::new(max.get().saturating_sub(command_len));
        plan_batches(selected, budget)
            .into_iter()
            .map(|batch| {
                let mut cmd = self.base_command(staged, top_level);
                cmd.args(batch);
                cmd
            })
            .collect()
    }

    /// Run the task, inheriting stdio.
    ///
    /// Returns `Ok(false)` if the task was skipped because its glob selected
    /// none of the staged files.
    ///
    /// # Errors
    /// Returns [`TaskError::Spawn`] or [`TaskError::Failed`] for the first
    /// invocation that does not succeed.
    #[instrument(skip_all, fields(task = %self.name))]
    pub fn run(
        &self,
        staged: &[PathBuf],
        top_level: &Path,
        max: MaxCommandLength,
    ) -> Result<bool, TaskError> {
        let selected: Vec<PathBuf> = self
            .select_files(staged, top_level)
            .into_iter()
            .cloned()
            .collect();
        if selected.is_empty() && !self.patterns.is_empty() {
            info!("no staged files match, skipping");
            return Ok(false);
        }

        let commands = self.build_commands(staged, &selected, top_level, max);
        debug!(command = %self, files = selected.len(), batches = commands.len(), "running task");
        for mut cmd in commands {
            let status = cmd.status().map_err(|source| TaskError::Spawn {
                task: self.name.clone(),
                program: self.command.first().cloned().unwrap_or_default(),
                source,
            })?;
            if !status.success() {
                warn!(exit_code = ?status.code(), "task failed");
                return Err(TaskError::Failed {
                    task: self.name.clone(),
                    exit_code: status.code(),
                });
            }
        }
        info!("task succeeded");
        Ok(true)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command.join(" "))
    }
}

fn join_lines(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Run `tasks` in order, stopping at the first failure.
///
/// # Errors
/// The first [`TaskError`] encountered.
pub fn run_all(
    tasks: &[Task],
    staged: &[PathBuf],
    top_level: &Path,
    max: MaxCommandLength,
) -> Result<(), TaskError> {
    for task in tasks {
        task.run(staged, top_level, max)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config(name: &str, command: &[&str], glob: &[&str], pass_files: bool) -> TaskConfig {
        TaskConfig {
            name: name.to_owned(),
            command: command.iter().map(|s| (*s).to_owned()).collect(),
            glob: glob.iter().map(|s| (*s).to_owned()).collect(),
            pass_files,
        }
    }

    #[test]
    fn invalid_glob_is_rejected() {
        let err = Task::from_config(&config("lint", &["true"], &["[a-"], false)).unwrap_err();
        assert!(matches!(err, TaskError::InvalidGlob { ref pattern, .. } if pattern == "[a-"));
    }

    #[test]
    fn globs_match_relative_paths() {
        let top = Path::new("/repo");
        let staged = vec![
            PathBuf::from("/repo/src/lib.rs"),
            PathBuf::from("/repo/README.md"),
            PathBuf::from("/repo/docs/guide.md"),
        ];
        let task = Task::from_config(&config("md", &["true"], &["*.md"], true)).unwrap();
        let selected = task.select_files(&staged, top);
        assert_eq!(selected, vec![&staged[1], &staged[2]]);

        let task = Task::from_config(&config("src", &["true"], &["src/**/*.rs"], true)).unwrap();
        assert_eq!(task.select_files(&staged, top), vec![&staged[0]]);
    }

    #[test]
    fn no_globs_selects_everything() {
        let staged = vec![PathBuf::from("/repo/a"), PathBuf::from("/repo/b")];
        let task = Task::ad_hoc(vec!["true".to_owned()]);
        assert_eq!(task.select_files(&staged, Path::new("/repo")).len(), 2);
        assert_eq!(task.name(), "true");
    }

    #[test]
    fn command_gets_env_and_file_arguments() {
        let staged = vec![PathBuf::from("/repo/a.rs"), PathBuf::from("/repo/b.md")];
        let task =
            Task::from_config(&config("fmt", &["rustfmt", "--check"], &["*.rs"], true)).unwrap();
        let selected = vec![staged[0].clone()];
        let cmds = task.build_commands(&staged, &selected, Path::new("/repo"), MaxCommandLength::OTHER);

        let [cmd] = cmds.as_slice() else {
            panic!("expected one invocation, got {}", cmds.len());
        };
        assert_eq!(cmd.get_program(), "rustfmt");
        let args: Vec<_> = cmd.get_args().collect();
        assert_eq!(args, vec!["--check", "/repo/a.rs"]);
        let env: Vec<_> = cmd.get_envs().collect();
        assert_eq!(env.len(), 1);
        assert_eq!(env[0].0, STAGED_FILES_ENV);
        assert_eq!(env[0].1.unwrap(), "/repo/a.rs\n/repo/b.md");
    }

    #[test]
    fn file_arguments_are_split_under_a_small_limit() {
        let staged: Vec<PathBuf> =
            (0..8).map(|i| PathBuf::from(format!("/repo/src/file_{i}.rs"))).collect();
        let task = Task::from_config(&config("fmt", &["rustfmt"], &["*.rs"], true)).unwrap();
        let cmds = task.build_commands(&staged, &staged, Path::new("/repo"), MaxCommandLength::new(64));

        assert!(cmds.len() > 1, "expected several invocations, got {}", cmds.len());
        let passed: Vec<PathBuf> = cmds
            .iter()
            .flat_map(|cmd| {
                assert_eq!(cmd.get_program(), "rustfmt");
                cmd.get_args().map(PathBuf::from)
            })
            .collect();
        assert_eq!(passed, staged);
    }

    #[test]
    fn tasks_without_file_arguments_run_once() {
        let staged: Vec<PathBuf> =
            (0..8).map(|i| PathBuf::from(format!("/repo/src/file_{i}.rs"))).collect();
        let task = Task::ad_hoc(vec!["cargo".to_owned(), "check".to_owned()]);
        let cmds = task.build_commands(&staged, &staged, Path::new("/repo"), MaxCommandLength::new(16));
        assert_eq!(cmds.len(), 1);
        assert_eq!(cmds[0].get_args().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn every_batch_runs_in_turn() {
        use std::fs;

        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("log");
        let staged: Vec<PathBuf> = (0..6).map(|i| dir.path().join(format!("f{i}.rs"))).collect();
        let script = format!("printf '%s\\n' \"$#\" >> {}", log.display());
        let task = Task::from_config(&config("count", &["sh", "-c", &script, "sh"], &[], true)).unwrap();

        let limit = MaxCommandLength::new(script.len() + 40);
        assert!(task.run(&staged, dir.path(), limit).unwrap());

        let counts: Vec<usize> = fs::read_to_string(&log)
            .unwrap()
            .lines()
            .map(|l| l.parse().unwrap())
            .collect();
        assert!(counts.len() > 1, "{counts:?}");
        assert_eq!(counts.iter().sum::<usize>(), staged.len());
    }

    #[cfg(unix)]
    #[test]
    fn unmatched_glob_skips_task() {
        let dir = tempfile::tempdir().unwrap();
        let staged = vec![dir.path().join("a.rs")];
        let task = Task::from_config(&config("never", &["false"], &["*.py"], true)).unwrap();
        assert!(!task.run(&staged, dir.path(), MaxCommandLength::OTHER).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn first_failure_stops_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let tasks = vec![
            Task::from_config(&config("fail", &["false"], &[], false)).unwrap(),
            Task::from_config(&config(
                "touch",
                &["touch", marker.to_str().unwrap()],
                &[],
                false,
            ))
            .unwrap(),
        ];
        let err = run_all(&tasks, &[dir.path().join("a")], dir.path(), MaxCommandLength::OTHER)
            .unwrap_err();
        assert!(matches!(err, TaskError::Failed { ref task, exit_code: Some(1) } if task == "fail"));
        assert!(!marker.exists());
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let task = Task::ad_hoc(vec!["stagehand-definitely-not-a-program".to_owned()]);
        let err = task
            .run(&[dir.path().join("a")], dir.path(), MaxCommandLength::OTHER)
            .unwrap_err();
        assert!(matches!(err, TaskError::Spawn { .. }));
    }
}
