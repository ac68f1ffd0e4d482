//! Rotating batch scheduler.
//!
//! Each run walks the package list from the front, handling packages until
//! the budget (the configured limit) is spent, the list runs out, or the run
//! is cancelled. The list is then rotated so the first unvisited package
//! leads the next run.
//!
//! The loop never fails: per-package errors are folded into
//! [`PackageReport`]s and the stop position comes back as a plain value, so
//! the caller can always rotate and persist.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use updater_core::{Package, PackageName};

use crate::outcome::PackageReport;

/// How many packages may still cost API calls this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    limit: usize,
    consumed: usize,
}

impl Budget {
    pub fn new(limit: usize) -> Self {
        Self { limit, consumed: 0 }
    }

    pub fn is_exhausted(&self) -> bool {
        self.consumed >= self.limit
    }

    pub fn consume(&mut self) {
        self.consumed += 1;
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.consumed)
    }
}

/// Handles one package; never fails.
#[async_trait]
pub trait PackageHandler: Send + Sync {
    async fn handle(&self, package: &Package) -> PackageReport;
}

/// What a batch run did.
#[derive(Debug)]
pub struct RunResult {
    /// Index of the first unvisited package, which is also the number of
    /// packages visited (ignored ones included). The list length when every
    /// package was visited.
    pub stop_index: usize,
    /// Budget spent.
    pub consumed: usize,
    pub cancelled: bool,
    pub reports: Vec<PackageReport>,
}

/// Visit `packages` in order until the budget of `limit` is spent.
///
/// Ignored packages are visited for free. A package whose handling was
/// cancelled counts as unvisited, so it leads the next run.
pub async fn run_batch(
    packages: &[Package],
    limit: usize,
    ignore: &HashSet<PackageName>,
    cancel: &CancellationToken,
    handler: &dyn PackageHandler,
) -> RunResult {
    let mut budget = Budget::new(limit);
    let mut reports = Vec::new();
    let mut stop_index = packages.len();
    let mut cancelled = false;

    for (idx, package) in packages.iter().enumerate() {
        if budget.is_exhausted() {
            stop_index = idx;
            break;
        }
        if cancel.is_cancelled() {
            stop_index = idx;
            cancelled = true;
            break;
        }
        if ignore.contains(&package.name) {
            tracing::info!(pkg_name = %package.name, outcome = "ignored", "skipping an ignored package");
            reports.push(PackageReport::ignored(package.name.clone()));
            continue;
        }

        let report = handler.handle(package).await;
        if report.is_cancelled() {
            stop_index = idx;
            cancelled = true;
            break;
        }
        if report.consumed {
            budget.consume();
        }
        reports.push(report);
    }

    tracing::info!(
        stop_index,
        consumed = budget.consumed(),
        remaining_budget = budget.remaining(),
        cancelled,
        "finished the batch"
    );
    RunResult {
        stop_index,
        consumed: budget.consumed(),
        cancelled,
        reports,
    }
}

/// `list[stop_index..] ++ list[..stop_index]`
pub fn rotate(list: &mut [Package], stop_index: usize) {
    list.rotate_left(stop_index.min(list.len()));
}
