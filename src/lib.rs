//! stagehand: run tasks against only the files staged for commit.
//!
//! The primary interface is the `stagehand` binary. The library exposes the
//! staging engine so that other tools (and the integration tests) can drive
//! a snapshot/apply/restore cycle directly:
//!
//! ```no_run
//! use stagehand::config::StagingSettings;
//! use stagehand::staging::{RunOutcome, run_staged};
//! use stagehand_git::CliRepo;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = CliRepo::open(std::path::Path::new("."))?;
//! let outcome = run_staged(&repo, &StagingSettings::default(), |snapshot| {
//!     println!("{} staged files", snapshot.staged_files().len());
//!     Ok::<(), String>(())
//! })?;
//! assert!(matches!(outcome, RunOutcome::Completed | RunOutcome::NothingStaged));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod hooks;
pub mod platform;
pub mod staging;
pub mod task;
pub mod telemetry;

pub use error::{Result, StagingError};
