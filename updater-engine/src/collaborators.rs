//! Seams to the outside world.
//!
//! The pipeline only talks to these traits; [`crate::toolchain`] and
//! [`crate::github`] hold the production implementations.

use std::path::PathBuf;

use async_trait::async_trait;

use updater_core::{PackageName, RepoCoordinates};

use crate::error::ToolError;

/// A branch holding exactly one commit on top of the default branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitRequest {
    pub branch: String,
    pub message: String,
    /// Files to add or update, relative to the tree root.
    pub files: Vec<PathBuf>,
    /// Files to delete, relative to the tree root.
    pub deletions: Vec<PathBuf>,
}

/// Pull request to open against the maintained repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    pub head: String,
    pub base: String,
}

/// External command line tools.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// The generator's `name@version` line for the latest release of
    /// `package`, trimmed.
    async fn generate_latest(&self, package: &PackageName) -> Result<String, ToolError>;

    async fn create_branch_with_commit(&self, request: &CommitRequest) -> Result<(), ToolError>;

    /// Ask for pull request `number` to be squash-merged once checks pass.
    async fn request_auto_merge(&self, number: u64) -> Result<(), ToolError>;
}

#[async_trait]
pub trait PullRequestService: Send + Sync {
    /// Open `pr`; returns its number.
    async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<u64, ToolError>;
}

#[async_trait]
pub trait RepositoryProbe: Send + Sync {
    /// `Location` of the redirect served for the repository's page, or
    /// `None` when the page is served directly.
    async fn redirect_location(&self, repo: &RepoCoordinates) -> Result<Option<String>, ToolError>;
}
