use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use stagehand::config::StagehandConfig;
use stagehand::hooks::HookInstaller;
use stagehand::staging::{RunOutcome, run_staged, staged};
use stagehand::task::{self, Task};
use stagehand::telemetry;
use stagehand_git::{CliRepo, GitRepo};
use tracing::{info, warn};

/// Run tasks against only the files staged for commit
///
/// Before the tasks run, everything not staged is set aside: unstaged edits,
/// untracked files and deletions. The tasks see exactly what will be
/// committed. Afterwards:
///
///   - on success, files the tasks changed are re-staged and the set-aside
///     work is put back on top
///   - on failure, the working copy and index are restored byte for byte
///
/// QUICK START:
///
///   # stagehand.toml
///   [[task]]
///   name = "fmt"
///   command = ["cargo", "fmt", "--"]
///   glob = ["*.rs"]
///   pass_files = true
///
///   [hooks]
///   pre-commit = "stagehand run"
///
///   stagehand hooks apply
#[derive(Parser)]
#[command(name = "stagehand")]
#[command(version, about)]
#[command(propagate_version = true)]
#[command(
    after_help = "See 'stagehand <command> --help' for more information on a specific command."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Configuration file [default: <repo>/stagehand.toml]
    #[arg(long, global = true, env = "STAGEHAND_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run tasks against the staged files
    ///
    /// Runs the command given after `--`, or every configured [[task]] in
    /// order. Exits non-zero if a task fails, after the working copy has
    /// been restored. Does nothing when no files are staged.
    Run {
        /// Ad-hoc command to run instead of the configured tasks
        #[arg(last = true)]
        command: Vec<String>,
    },

    /// Print the files staged for commit
    Staged {
        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Install or remove stagehand-managed git hooks
    #[command(subcommand)]
    Hooks(HooksCommands),
}

#[derive(Subcommand)]
enum HooksCommands {
    /// Install the hooks configured under [hooks], removing any others
    Apply,
    /// Remove every stagehand-managed hook
    Remove,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// One path per line, relative to the repository root
    Text,
    /// A JSON object with the repository root and the staged paths
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.verbose);

    let cwd = std::env::current_dir().context("could not determine current directory")?;
    let repo = CliRepo::open(&cwd).context("not inside a git repository")?;

    match cli.command {
        Commands::Run { command } => run(&repo, cli.config.as_deref(), command),
        Commands::Staged { format } => print_staged(&repo, format),
        Commands::Hooks(cmd) => hooks(&repo, cli.config.as_deref(), &cmd),
    }
}

fn load_config(repo: &CliRepo, path: Option<&Path>) -> Result<StagehandConfig> {
    let config = match path {
        Some(p) => StagehandConfig::load(p),
        None => StagehandConfig::load_from_repo(repo.top_level()),
    };
    config.context("could not load configuration")
}

fn run(repo: &CliRepo, config_path: Option<&Path>, command: Vec<String>) -> Result<()> {
    let config = load_config(repo, config_path)?;

    if config.hooks.auto_apply {
        HookInstaller::for_common_dir(repo.common_dir())
            .apply(&config.hooks.scripts, Local::now())
            .context("could not apply git hooks")?;
    }

    let tasks = if command.is_empty() {
        config
            .tasks
            .iter()
            .map(Task::from_config)
            .collect::<Result<Vec<_>, _>>()
            .context("invalid task configuration")?
    } else {
        vec![Task::ad_hoc(command)]
    };
    if tasks.is_empty() {
        warn!("no tasks configured, nothing to do");
        return Ok(());
    }

    let settings = config.staging.settings();
    let outcome = run_staged(repo, &settings, |snapshot| {
        task::run_all(
            &tasks,
            snapshot.staged_files(),
            repo.top_level(),
            settings.max_command_length,
        )
    })
    .context("staging run failed")?;

    match outcome {
        RunOutcome::NothingStaged | RunOutcome::Completed => Ok(()),
        RunOutcome::TaskFailed(e) => {
            info!("working copy restored after task failure");
            Err(anyhow::Error::new(e).context("task failed; working copy restored"))
        }
    }
}

#[derive(Serialize)]
struct StagedReport {
    top_level: PathBuf,
    files: Vec<PathBuf>,
}

fn print_staged(repo: &CliRepo, format: OutputFormat) -> Result<()> {
    let top_level = repo.top_level();
    let files: Vec<PathBuf> = staged::staged_files(repo)
        .context("could not list staged files")?
        .into_iter()
        .map(|p| p.strip_prefix(top_level).map(Path::to_path_buf).unwrap_or(p))
        .collect();

    match format {
        OutputFormat::Text => {
            for file in &files {
                println!("{}", file.display());
            }
        }
        OutputFormat::Json => {
            let report = StagedReport {
                top_level: top_level.to_path_buf(),
                files,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

fn hooks(repo: &CliRepo, config_path: Option<&Path>, cmd: &HooksCommands) -> Result<()> {
    let installer = HookInstaller::for_common_dir(repo.common_dir());
    match cmd {
        HooksCommands::Apply => {
            let config = load_config(repo, config_path)?;
            installer
                .apply(&config.hooks.scripts, Local::now())
                .context("could not apply git hooks")?;
            let installed = config
                .hooks
                .scripts
                .values()
                .filter(|body| !body.trim().is_empty())
                .count();
            println!(
                "Installed {installed} hook(s) in {}",
                installer.hooks_dir().display()
            );
        }
        HooksCommands::Remove => {
            installer.remove_all().context("could not remove git hooks")?;
            println!(
                "Removed stagehand hooks from {}",
                installer.hooks_dir().display()
            );
        }
    }
    Ok(())
}
