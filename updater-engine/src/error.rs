//! Error types for updater-engine.

use std::path::PathBuf;

use thiserror::Error;

use updater_core::{CodecError, ConfigError, PackageName, TreeError};
use updater_renderer::RenderError;
use updater_store::StoreError;

/// Failure of an external collaborator: a child process or an HTTP call.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: &'static str,
        status: String,
        stderr: String,
    },

    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("{url} returned HTTP {status}: {body}")]
    Response { url: String, status: u16, body: String },

    #[error("background task failed: {0}")]
    Background(String),
}

/// The repository probe failed. Never fatal: the package falls through to
/// the regular update pipeline.
#[derive(Debug, Error)]
pub enum RedirectCheckError {
    #[error("repository probe failed: {0}")]
    Probe(#[from] ToolError),

    #[error("redirect to an unrecognized location '{0}'")]
    UnexpectedLocation(String),
}

/// Why a single package could not be handled.
///
/// Each variant knows whether the attempt still counts against the run's
/// limit; see [`PackageError::consumes_budget`].
#[derive(Debug, Error)]
pub enum PackageError {
    #[error("failed to read {path}: {source}")]
    ReadDefinition {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to get the current version: {0}")]
    CurrentVersion(#[from] CodecError),

    #[error("package name '{0}' has no owner/repo form")]
    InvalidName(PackageName),

    #[error("failed to generate the latest version: {0}")]
    Generate(#[source] ToolError),

    #[error("failed to write {path}: {source}")]
    WriteDefinition {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render a pull request template: {0}")]
    Render(#[from] RenderError),

    #[error("failed to create a branch: {0}")]
    Branch(#[source] ToolError),

    #[error("failed to create a pull request: {0}")]
    PullRequest(#[source] ToolError),

    #[error("failed to move the package: {0}")]
    Relocate(#[from] TreeError),

    #[error("cancelled")]
    Cancelled,
}

impl PackageError {
    /// An unreadable definition or a cancelled attempt costs nothing; every
    /// other failure does.
    pub fn consumes_budget(&self) -> bool {
        !matches!(self, PackageError::ReadDefinition { .. } | PackageError::Cancelled)
    }
}

/// Run-level failures. Everything except [`RunError::StatePersist`] happens
/// before any package is touched.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid pull request template: {0}")]
    Templates(#[from] RenderError),

    #[error("failed to pull the state from the container registry: {0}")]
    StateUnavailable(#[source] StoreError),

    #[error("failed to search pkg.yaml: {0}")]
    Discover(#[source] TreeError),

    #[error("failed to push the state to the container registry: {0}")]
    StatePersist(#[source] StoreError),

    #[error("cancelled before any package was processed")]
    Cancelled,
}
