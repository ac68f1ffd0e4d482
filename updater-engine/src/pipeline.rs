//! The per-package decision pipeline.
//!
//! A package is first checked for a repository transfer. A transferred
//! package is moved on disk and gets a transfer PR; everything else goes
//! through the version update steps: read the pinned line, ask the generator
//! for the latest one, compare, rewrite, commit, open a PR and request
//! auto-merge when the new version is strictly newer.
//!
//! Every external call races the run's [`CancellationToken`].

use std::future::Future;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use updater_core::codec::{extract_current_version, replace_version_line};
use updater_core::tree::{self, REGISTRY_FILE};
use updater_core::version::compare;
use updater_core::{Package, PackageName};
use updater_renderer::{PrTemplates, TemplateContext};

use crate::collaborators::{CommitRequest, NewPullRequest, PullRequestService, RepositoryProbe, Toolchain};
use crate::error::PackageError;
use crate::outcome::{AutoMerge, Outcome, PackageReport, SkipReason};
use crate::redirect::{check_redirect, RedirectInfo};
use crate::scheduler::PackageHandler;

/// Pseudo-versions the generator pins when a package has no real release.
pub const FLOATING_VERSIONS: [&str; 3] = ["latest", "edge", "stable"];

/// Branch every pull request targets.
pub const BASE_BRANCH: &str = "main";

const BRANCH_PREFIX: &str = "aqua-registry-updater";

pub fn update_branch(name: &PackageName, version: &str) -> String {
    format!("{BRANCH_PREFIX}-{name}-{version}")
}

/// Same shape as [`update_branch`] with an empty version slot.
pub fn transfer_branch(name: &PackageName) -> String {
    format!("{BRANCH_PREFIX}-transfer-{name}-")
}

/// Borrowed view of everything one package needs.
pub struct PackagePipeline<'a> {
    pub root: &'a Path,
    pub templates: &'a PrTemplates,
    pub toolchain: &'a dyn Toolchain,
    pub pulls: &'a dyn PullRequestService,
    pub probe: &'a dyn RepositoryProbe,
    pub cancel: &'a CancellationToken,
}

impl PackagePipeline<'_> {
    /// Run `fut` unless the run is cancelled first.
    async fn guard<T>(&self, fut: impl Future<Output = T>) -> Result<T, PackageError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PackageError::Cancelled),
            out = fut => Ok(out),
        }
    }

    /// Handle one package. Failures become an `Errored` report whose budget
    /// consumption follows [`PackageError::consumes_budget`].
    pub async fn process(&self, package: &Package) -> PackageReport {
        let name = &package.name;
        match self.redirected(name).await {
            Ok(Some(info)) => {
                return match self.transfer(&info).await {
                    Ok(outcome) => PackageReport::new(name.clone(), outcome, true),
                    Err(err) => PackageReport::errored(name.clone(), err),
                };
            }
            Ok(None) => {}
            Err(err) => return PackageReport::errored(name.clone(), err),
        }

        match self.update(name).await {
            Ok((outcome, consumed)) => PackageReport::new(name.clone(), outcome, consumed),
            Err(err) => PackageReport::errored(name.clone(), err),
        }
    }

    /// Probe failures are logged and treated as "not moved".
    async fn redirected(&self, name: &PackageName) -> Result<Option<RedirectInfo>, PackageError> {
        match self.guard(check_redirect(self.probe, name)).await? {
            Ok(info) => Ok(info),
            Err(err) => {
                tracing::warn!(error = %err, "failed to check a repository redirect");
                Ok(None)
            }
        }
    }

    async fn transfer(&self, info: &RedirectInfo) -> Result<Outcome, PackageError> {
        tracing::info!(
            new_pkg_name = %info.new_name,
            from = %info.from,
            to = %info.to,
            "the repository was transferred"
        );
        let ctx = TemplateContext::for_transfer(&info.old_name, &info.from, &info.to, &info.new_name);
        let pr = self.templates.render_transfer(&ctx)?;

        let relocation = tree::relocate_at(self.root, &info.old_name, &info.new_name)?;
        tree::regenerate_index_at(self.root)?;

        let branch = transfer_branch(&info.old_name);
        let mut files = vec![PathBuf::from(REGISTRY_FILE)];
        files.extend(relocation.added);
        let commit = CommitRequest {
            branch: branch.clone(),
            message: pr.title.clone(),
            files,
            deletions: relocation.removed,
        };
        self.guard(self.toolchain.create_branch_with_commit(&commit))
            .await?
            .map_err(PackageError::Branch)?;

        let pr_number = self
            .guard(self.pulls.create_pull_request(&NewPullRequest {
                title: pr.title,
                body: pr.body,
                head: branch.clone(),
                base: BASE_BRANCH.to_owned(),
            }))
            .await?
            .map_err(PackageError::PullRequest)?;
        tracing::info!(pr_number, branch = %branch, "created a transfer pull request");

        Ok(Outcome::Redirected {
            new_name: info.new_name.clone(),
            branch,
            pr_number,
        })
    }

    /// The version update steps; the flag is budget consumption.
    async fn update(&self, name: &PackageName) -> Result<(Outcome, bool), PackageError> {
        let path = tree::definition_path_at(self.root, name);
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| PackageError::ReadDefinition {
                path: path.clone(),
                source,
            })?;
        let current_version = extract_current_version(name.as_str(), &content)?;
        if name.repo_coordinates().is_none() {
            return Err(PackageError::InvalidName(name.clone()));
        }

        let generated = self
            .guard(self.toolchain.generate_latest(name))
            .await?
            .map_err(PackageError::Generate)?;
        let replacement = replace_version_line(&content, &generated);
        if !replacement.changed {
            tracing::debug!(generated = %generated, "the pinned version is up to date");
            return Ok((Outcome::Unchanged, false));
        }
        let new_version = replacement.new_version;

        if FLOATING_VERSIONS.contains(&new_version.as_str()) {
            tracing::info!(new_version = %new_version, "skipping a floating version");
            return Ok((Outcome::Skipped(SkipReason::FloatingVersion(new_version)), true));
        }

        let eligible = match compare(&current_version, &new_version) {
            Ok(true) => true,
            Ok(false) => {
                tracing::info!(
                    current_version = %current_version,
                    new_version = %new_version,
                    "the new version is not newer than the current one"
                );
                let reason = SkipReason::NotNewer {
                    current: current_version,
                    new: new_version,
                };
                return Ok((Outcome::Skipped(reason), true));
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    current_version = %current_version,
                    new_version = %new_version,
                    "failed to compare versions, auto-merge will not be enabled"
                );
                false
            }
        };

        tokio::fs::write(&path, &replacement.content)
            .await
            .map_err(|source| PackageError::WriteDefinition {
                path: path.clone(),
                source,
            })?;

        let ctx = TemplateContext::for_update(name, &current_version, &new_version);
        let pr = self.templates.render_update(&ctx)?;
        let branch = update_branch(name, &new_version);
        let commit = CommitRequest {
            branch: branch.clone(),
            message: pr.title.clone(),
            files: vec![tree::definition_path(name)],
            deletions: vec![],
        };
        self.guard(self.toolchain.create_branch_with_commit(&commit))
            .await?
            .map_err(PackageError::Branch)?;

        let pr_number = self
            .guard(self.pulls.create_pull_request(&NewPullRequest {
                title: pr.title,
                body: pr.body,
                head: branch.clone(),
                base: BASE_BRANCH.to_owned(),
            }))
            .await?
            .map_err(PackageError::PullRequest)?;
        tracing::info!(pr_number, new_version = %new_version, "created a pull request");

        let auto_merge = if eligible {
            self.auto_merge(pr_number).await
        } else {
            AutoMerge::NotEligible
        };

        Ok((
            Outcome::Updated {
                current_version,
                new_version,
                branch,
                pr_number,
                auto_merge,
            },
            true,
        ))
    }

    /// The PR already exists at this point, so nothing here fails the
    /// package.
    async fn auto_merge(&self, pr_number: u64) -> AutoMerge {
        match self.guard(self.toolchain.request_auto_merge(pr_number)).await {
            Ok(Ok(())) => AutoMerge::Requested,
            Ok(Err(err)) => {
                tracing::warn!(pr_number, error = %err, "failed to enable auto-merge");
                AutoMerge::Failed(err.to_string())
            }
            Err(err) => {
                tracing::warn!(pr_number, "auto-merge request was cancelled");
                AutoMerge::Failed(err.to_string())
            }
        }
    }
}

#[async_trait]
impl<'a> PackageHandler for PackagePipeline<'a> {
    async fn handle(&self, package: &Package) -> PackageReport {
        let span = tracing::info_span!("package", pkg_name = %package.name);
        async {
            let report = self.process(package).await;
            log_report(&report);
            report
        }
        .instrument(span)
        .await
    }
}

fn log_report(report: &PackageReport) {
    let outcome = report.outcome.label();
    let consumed = report.consumed;
    match &report.outcome {
        Outcome::Errored(err) => {
            tracing::error!(outcome, consumed, error = %err, "failed to handle the package");
        }
        Outcome::Updated { new_version, pr_number, .. } => {
            tracing::info!(outcome, consumed, new_version = %new_version, pr_number, "handled the package");
        }
        _ => tracing::info!(outcome, consumed, "handled the package"),
    }
}
