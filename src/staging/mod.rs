//! The staging snapshot/restore engine.
//!
//! Lets tasks run against exactly the staged content of the working copy,
//! then either folds their output back into the index or restores the
//! working copy byte for byte.
//!
//! - [`staged`]: the set of files staged for commit.
//! - [`snapshot`]: the backup stash entry and its two patch files.
//! - [`merge_status`]: in-progress merge markers kept across destructive git
//!   operations.
//! - [`patch`]: 2-way/3-way re-application of the developer's edits.
//! - [`restage`]: batched re-adding of task output to the index.
//! - [`session`]: the save → apply-or-restore → delete sequence.

pub mod merge_status;
pub mod patch;
pub mod restage;
pub mod session;
pub mod snapshot;
pub mod staged;

#[cfg(test)]
pub(crate) mod fake;

pub use merge_status::MergeStatus;
pub use session::{RunOutcome, StagingSession, TaskOutcome, run_staged};
pub use snapshot::Snapshot;
