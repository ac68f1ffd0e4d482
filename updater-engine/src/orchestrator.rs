//! One bot run: pull the state, reconcile it with the tree, handle a batch,
//! rotate, push.
//!
//! Once the batch has started the state is always pushed back, whatever
//! happened to individual packages and even when the run was cancelled.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use updater_core::config::Config;
use updater_core::tree;
use updater_core::{Package, PackageList, RepoRef};
use updater_renderer::PrTemplates;
use updater_store::StateStore;

use crate::collaborators::{PullRequestService, RepositoryProbe, Toolchain};
use crate::error::RunError;
use crate::outcome::{Outcome, PackageReport};
use crate::pipeline::PackagePipeline;
use crate::reconcile::reconcile;
use crate::scheduler::{rotate, run_batch, RunResult};

/// Production or fake implementations of the external seams.
pub struct Collaborators {
    pub toolchain: Box<dyn Toolchain>,
    pub pulls: Box<dyn PullRequestService>,
    pub probe: Box<dyn RepositoryProbe>,
}

/// What a completed run did, and the list it persisted.
#[derive(Debug)]
pub struct RunSummary {
    pub result: RunResult,
    pub persisted: PackageList,
}

pub struct Orchestrator {
    root: PathBuf,
    config: Config,
    templates: PrTemplates,
    store: StateStore,
    collaborators: Collaborators,
}

impl Orchestrator {
    pub fn new(
        root: impl Into<PathBuf>,
        config: Config,
        templates: PrTemplates,
        store: StateStore,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            root: root.into(),
            config,
            templates,
            store,
            collaborators,
        }
    }

    /// Run one batch.
    ///
    /// Fails before touching any package when the state cannot be pulled or
    /// the tree cannot be walked. After the batch, a push failure is the
    /// only error; pull requests opened by then stay open.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<RunSummary, RunError> {
        let persisted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RunError::Cancelled),
            pulled = self.store.pull() => pulled.map_err(RunError::StateUnavailable)?,
        };
        let discovered = tree::discover_at(&self.root).map_err(RunError::Discover)?;
        let mut packages = reconcile(persisted, &discovered);
        info!(
            num_of_packages = packages.len(),
            limit = self.config.limit,
            "starting the batch"
        );

        let pipeline = PackagePipeline {
            root: &self.root,
            templates: &self.templates,
            toolchain: self.collaborators.toolchain.as_ref(),
            pulls: self.collaborators.pulls.as_ref(),
            probe: self.collaborators.probe.as_ref(),
            cancel,
        };
        let result = run_batch(
            &packages,
            self.config.limit,
            &self.config.ignore_packages,
            cancel,
            &pipeline,
        )
        .await;
        log_tally(&result.reports);

        apply_renames(&mut packages, &result.reports);
        rotate(&mut packages, result.stop_index);

        // Not raced with `cancel`: the write-back must finish.
        if let Err(err) = self.store.push(&packages).await {
            error!(error = %err, "failed to push the state to the container registry");
            return Err(RunError::StatePersist(err));
        }
        Ok(RunSummary {
            result,
            persisted: packages,
        })
    }
}

/// Load the config under `root` and compile its templates.
pub fn prepare(root: &Path, repo: &RepoRef) -> Result<(Config, PrTemplates), RunError> {
    let config = Config::load_at(root, repo)?;
    let templates = PrTemplates::compile(&config.templates)?;
    Ok((config, templates))
}

/// Seed the artifact with an empty package list.
pub async fn init_state(store: &StateStore) -> Result<(), RunError> {
    store.push(&[]).await.map_err(RunError::StatePersist)?;
    info!("pushed an empty state");
    Ok(())
}

/// Point state entries of transferred packages at their new names, unless
/// the new name is already tracked.
fn apply_renames(packages: &mut [Package], reports: &[PackageReport]) {
    for report in reports {
        let Outcome::Redirected { new_name, .. } = &report.outcome else {
            continue;
        };
        if packages.iter().any(|p| p.name == *new_name) {
            info!(
                pkg_name = %report.name,
                new_pkg_name = %new_name,
                "the new package name is already tracked, keeping the old entry"
            );
            continue;
        }
        if let Some(entry) = packages.iter_mut().find(|p| p.name == report.name) {
            entry.name = new_name.clone();
        }
    }
}

fn log_tally(reports: &[PackageReport]) {
    let mut tally: BTreeMap<&'static str, usize> = BTreeMap::new();
    for report in reports {
        *tally.entry(report.outcome.label()).or_default() += 1;
    }
    info!(?tally, "package outcomes");
}
