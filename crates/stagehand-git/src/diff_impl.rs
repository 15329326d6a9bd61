//! Patch production and application.
//!
//! Both producers emit binary-safe, zero-context patches with colour and
//! external diff drivers disabled, because the output is fed straight back
//! into `git apply --unidiff-zero`.

use std::ffi::OsString;
use std::path::Path;

use tracing::debug;

use crate::cli_repo::CliRepo;
use crate::error::GitError;
use crate::types::{ApplyMode, ApplyOutcome};

const PATCH_FLAGS: [&str; 5] = [
    "--binary",
    "--unified=0",
    "--no-color",
    "--no-ext-diff",
    "--patch",
];

fn output_flag(out: &Path) -> OsString {
    let mut flag = OsString::from("--output=");
    flag.push(out.as_os_str());
    flag
}

pub fn diff_reverse_to_file(repo: &CliRepo, rev: &str, out: &Path) -> Result<(), GitError> {
    let mut args: Vec<OsString> = vec!["diff".into()];
    args.extend(PATCH_FLAGS.iter().map(OsString::from));
    args.push(output_flag(out));
    args.push("-R".into());
    args.push(rev.into());
    repo.run(&args)?;
    Ok(())
}

pub fn show_to_file(repo: &CliRepo, rev: &str, out: &Path) -> Result<(), GitError> {
    let mut args: Vec<OsString> = vec!["show".into()];
    args.extend(PATCH_FLAGS.iter().map(OsString::from));
    args.push("--format=%b".into());
    args.push(output_flag(out));
    args.push(rev.into());
    repo.run(&args)?;
    Ok(())
}

pub fn rev_exists(repo: &CliRepo, rev: &str) -> Result<bool, GitError> {
    let (command, output) = repo.output(["rev-parse", "--verify", "--quiet", rev])?;
    match output.status.code() {
        Some(0) => Ok(true),
        Some(1) => Ok(false),
        exit_code => Err(GitError::CommandFailed {
            command,
            exit_code,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        }),
    }
}

pub fn apply_patch(repo: &CliRepo, patch: &Path, mode: ApplyMode) -> Result<ApplyOutcome, GitError> {
    let mut args: Vec<OsString> = vec![
        "apply".into(),
        "-v".into(),
        "--whitespace=nowarn".into(),
        "--recount".into(),
        "--unidiff-zero".into(),
    ];
    if mode == ApplyMode::ThreeWay {
        args.push("--3way".into());
    }
    args.push(patch.as_os_str().to_owned());

    let (command, output) = repo.output(&args)?;
    if output.status.success() {
        return Ok(ApplyOutcome::Applied);
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_owned();
    debug!(%command, %mode, exit_code = ?output.status.code(), "patch rejected");
    Ok(ApplyOutcome::Conflict { stderr })
}
