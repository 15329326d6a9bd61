//! Status and staged-file listing.

use std::path::PathBuf;

use crate::cli_repo::CliRepo;
use crate::error::GitError;
use crate::types::Status;

pub fn status(repo: &CliRepo, include_ignored: bool) -> Result<Status, GitError> {
    let mut args = vec!["status", "--porcelain", "-z"];
    if include_ignored {
        args.push("--ignored");
    }
    let stdout = repo.run(&args)?;
    Status::parse_porcelain_z(&stdout)
}

pub fn staged_files(repo: &CliRepo) -> Result<Vec<PathBuf>, GitError> {
    let stdout = repo.run([
        "diff",
        "--staged",
        "--diff-filter=ACMR",
        "--name-only",
        "-z",
    ])?;
    repo.resolve_z_paths(&stdout)
}
