//! [`Toolchain`] backed by child processes.
//!
//! | Operation                   | Command                                            |
//! |-----------------------------|----------------------------------------------------|
//! | `generate_latest`           | `aqua g <pkg>`                                     |
//! | `create_branch_with_commit` | `ghcp commit -r <repo> -b <branch> -m <msg> [-d <a,b>] <files>` |
//! | `request_auto_merge`        | `gh -R <repo> pr merge -s --auto <number>`         |
//!
//! Children run in the tree root and are killed if the calling future is
//! dropped, which is how cancellation reaches them.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use updater_core::{PackageName, RepoRef};

use crate::collaborators::{CommitRequest, Toolchain};
use crate::error::ToolError;

pub struct ProcessToolchain {
    root: PathBuf,
    repo: RepoRef,
}

impl ProcessToolchain {
    pub fn new(root: impl Into<PathBuf>, repo: RepoRef) -> Self {
        Self {
            root: root.into(),
            repo,
        }
    }

    async fn run(&self, program: &'static str, args: &[String]) -> Result<String, ToolError> {
        tracing::debug!(program, ?args, "running command");
        let output = Command::new(program)
            .args(args)
            .current_dir(&self.root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ToolError::Spawn { program, source })?;

        if !output.status.success() {
            return Err(ToolError::Exit {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Toolchain for ProcessToolchain {
    async fn generate_latest(&self, package: &PackageName) -> Result<String, ToolError> {
        let stdout = self.run("aqua", &generate_args(package)).await?;
        Ok(stdout.trim().to_owned())
    }

    async fn create_branch_with_commit(&self, request: &CommitRequest) -> Result<(), ToolError> {
        self.run("ghcp", &commit_args(&self.repo, request)).await?;
        Ok(())
    }

    async fn request_auto_merge(&self, number: u64) -> Result<(), ToolError> {
        self.run("gh", &merge_args(&self.repo, number)).await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Argument builders
// ---------------------------------------------------------------------------

fn generate_args(package: &PackageName) -> Vec<String> {
    vec!["g".to_owned(), package.to_string()]
}

fn commit_args(repo: &RepoRef, request: &CommitRequest) -> Vec<String> {
    let mut args = vec![
        "commit".to_owned(),
        "-r".to_owned(),
        repo.to_string(),
        "-b".to_owned(),
        request.branch.clone(),
        "-m".to_owned(),
        request.message.clone(),
    ];
    if !request.deletions.is_empty() {
        args.push("-d".to_owned());
        args.push(
            request
                .deletions
                .iter()
                .map(|p| slash_path(p))
                .collect::<Vec<_>>()
                .join(","),
        );
    }
    args.extend(request.files.iter().map(|p| slash_path(p)));
    args
}

fn merge_args(repo: &RepoRef, number: u64) -> Vec<String> {
    vec![
        "-R".to_owned(),
        repo.to_string(),
        "pr".to_owned(),
        "merge".to_owned(),
        "-s".to_owned(),
        "--auto".to_owned(),
        number.to_string(),
    ]
}

/// Repository paths are always `/`-separated for the tools.
fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
