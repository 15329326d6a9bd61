//! Index manipulation: ls-files, add, and hard reset.

use std::ffi::OsString;
use std::path::PathBuf;

use crate::cli_repo::CliRepo;
use crate::error::GitError;
use crate::types::LsFilter;

pub fn ls_files(repo: &CliRepo, filter: LsFilter) -> Result<Vec<PathBuf>, GitError> {
    let stdout = repo.run(["ls-files", "-z", filter.flag()])?;
    repo.resolve_z_paths(&stdout)
}

pub fn add(repo: &CliRepo, paths: &[PathBuf]) -> Result<(), GitError> {
    if paths.is_empty() {
        return Ok(());
    }
    let mut args: Vec<OsString> = vec!["add".into(), "--".into()];
    args.extend(paths.iter().map(|p| p.as_os_str().to_owned()));
    repo.run(&args)?;
    Ok(())
}

pub fn reset_hard(repo: &CliRepo) -> Result<(), GitError> {
    repo.run(["reset", "--hard", "--quiet", "HEAD"])?;
    Ok(())
}
