//! `aqua-registry-updater update`: one rotating batch.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;

use updater_core::config::Environment;
use updater_engine::{
    prepare, Collaborators, GitHubPulls, HttpRepositoryProbe, Orchestrator, ProcessToolchain,
};
use updater_store::{OciRegistry, RegistryCredentials, StateStore};

#[derive(Args, Debug)]
pub struct UpdateArgs {}

impl UpdateArgs {
    pub async fn run(self, root: &Path) -> Result<()> {
        let env = Environment::from_process().context("invalid environment")?;
        let (config, templates) = prepare(root, &env.repo).context("failed to load the configuration")?;
        let registry_token = env.require_registry_token()?;

        let registry = &config.container_registry;
        tracing::info!(artifact = %registry.reference(), limit = config.limit, "starting the update run");
        let artifacts = OciRegistry::new(
            &registry.registry,
            &registry.repository,
            RegistryCredentials::new(registry.username.clone(), registry_token),
        );
        let store = StateStore::new(Box::new(artifacts), root);
        let collaborators = Collaborators {
            toolchain: Box::new(ProcessToolchain::new(root, env.repo.clone())),
            pulls: Box::new(GitHubPulls::new(env.repo.clone(), env.github_token.clone())),
            probe: Box::new(HttpRepositoryProbe::new()),
        };
        let orchestrator = Orchestrator::new(root, config, templates, store, collaborators);

        let cancel = CancellationToken::new();
        let signals = tokio::spawn(cancel_on_signal(cancel.clone()));
        let outcome = orchestrator.run(&cancel).await;
        signals.abort();

        let summary = outcome.context("the update run failed")?;
        if summary.result.cancelled {
            bail!(
                "the run was interrupted after {} package(s); the state was saved",
                summary.result.stop_index
            );
        }
        Ok(())
    }
}

/// Cancel `token` on SIGINT or SIGTERM.
async fn cancel_on_signal(token: CancellationToken) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = terminate.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for SIGTERM");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::warn!("received a shutdown signal, stopping the batch");
    token.cancel();
}
