//! Git abstraction layer for stagehand.
//!
//! This crate defines the [`GitRepo`] trait, the single interface through
//! which the staging engine talks to git. The engine never spawns `git`
//! itself.
//!
//! # Crate layout
//!
//! - [`repo`]: the [`GitRepo`] trait definition.
//! - [`types`]: value types used in trait signatures ([`Status`],
//!   [`StatusLine`], [`StashName`], [`ApplyOutcome`], etc.).
//! - [`error`]: the [`GitError`] enum returned by all trait methods.
//! - [`CliRepo`]: the implementation backed by the `git` binary.

pub mod error;
pub mod repo;
pub mod types;

// git CLI implementation modules
mod cli_repo;
mod diff_impl;
mod index_impl;
mod stash_impl;
mod status_impl;

pub use cli_repo::CliRepo;

// Re-export the main trait and commonly used types at the crate root for
// ergonomic imports: `use stagehand_git::{GitRepo, GitError, Status};`
pub use error::GitError;
pub use repo::GitRepo;
pub use types::{ApplyMode, ApplyOutcome, LsFilter, StashName, Status, StatusLine};
