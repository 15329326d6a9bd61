//! Stash push/list/apply/drop through the git CLI.
//!
//! Stash entries are addressed positionally (`stash@{n}`), so callers must
//! re-resolve a [`StashName`] from [`stash_list`] after anything that could
//! have pushed or dropped an entry.

use crate::cli_repo::CliRepo;
use crate::error::GitError;
use crate::types::StashName;

pub fn stash_push(repo: &CliRepo, message: &str) -> Result<(), GitError> {
    repo.run([
        "stash",
        "push",
        "--include-untracked",
        "--keep-index",
        format!("--message={message}").as_str(),
    ])?;
    Ok(())
}

pub fn stash_list(repo: &CliRepo) -> Result<Vec<String>, GitError> {
    let stdout = repo.run(["stash", "list"])?;
    Ok(String::from_utf8_lossy(&stdout)
        .lines()
        .map(str::to_owned)
        .collect())
}

pub fn stash_apply_index(repo: &CliRepo, name: StashName) -> Result<(), GitError> {
    repo.run(["stash", "apply", "--quiet", "--index", name.to_string().as_str()])?;
    Ok(())
}

pub fn stash_drop(repo: &CliRepo, name: StashName) -> Result<(), GitError> {
    repo.run(["stash", "drop", "--quiet", name.to_string().as_str()])?;
    Ok(())
}
