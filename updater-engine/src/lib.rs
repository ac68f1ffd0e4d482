//! Update engine: state reconciliation, the rotating batch scheduler and the
//! per-package pipeline, plus the process and HTTP adapters it drives.

pub mod collaborators;
mod error;
pub mod github;
pub mod orchestrator;
pub mod outcome;
pub mod pipeline;
pub mod reconcile;
pub mod redirect;
pub mod scheduler;
pub mod toolchain;

pub use collaborators::{CommitRequest, NewPullRequest, PullRequestService, RepositoryProbe, Toolchain};
pub use error::{PackageError, RedirectCheckError, RunError, ToolError};
pub use github::{GitHubPulls, HttpRepositoryProbe};
pub use orchestrator::{init_state, prepare, Collaborators, Orchestrator, RunSummary};
pub use outcome::{AutoMerge, Outcome, PackageReport, SkipReason};
pub use redirect::{check_redirect, RedirectInfo};
pub use scheduler::{rotate, run_batch, Budget, PackageHandler, RunResult};
pub use toolchain::ProcessToolchain;
