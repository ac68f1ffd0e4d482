//! What happened to each visited package.

use updater_core::PackageName;

use crate::error::PackageError;

/// Result of asking for auto-merge on an update PR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoMerge {
    Requested,
    /// The version comparison failed, so the PR waits for a human.
    NotEligible,
    /// The request was made and rejected; the PR stays open.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The generator pinned `latest`, `edge` or `stable`.
    FloatingVersion(String),
    /// Older, equal, or on a different release channel.
    NotNewer { current: String, new: String },
}

#[derive(Debug)]
pub enum Outcome {
    Updated {
        current_version: String,
        new_version: String,
        branch: String,
        pr_number: u64,
        auto_merge: AutoMerge,
    },
    Redirected {
        new_name: PackageName,
        branch: String,
        pr_number: u64,
    },
    /// The generator reproduced the pinned line.
    Unchanged,
    Skipped(SkipReason),
    Ignored,
    Errored(PackageError),
}

impl Outcome {
    /// Short value for the `outcome` log field.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Updated { .. } => "updated",
            Outcome::Redirected { .. } => "redirected",
            Outcome::Unchanged => "unchanged",
            Outcome::Skipped(_) => "skipped",
            Outcome::Ignored => "ignored",
            Outcome::Errored(_) => "errored",
        }
    }
}

/// One visited package.
#[derive(Debug)]
pub struct PackageReport {
    pub name: PackageName,
    pub outcome: Outcome,
    /// Whether the visit counted against the run's limit.
    pub consumed: bool,
}

impl PackageReport {
    pub fn new(name: PackageName, outcome: Outcome, consumed: bool) -> Self {
        Self {
            name,
            outcome,
            consumed,
        }
    }

    pub fn ignored(name: PackageName) -> Self {
        Self::new(name, Outcome::Ignored, false)
    }

    pub fn errored(name: PackageName, err: PackageError) -> Self {
        let consumed = err.consumes_budget();
        Self::new(name, Outcome::Errored(err), consumed)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, Outcome::Errored(PackageError::Cancelled))
    }
}
