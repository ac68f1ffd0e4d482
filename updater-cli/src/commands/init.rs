//! `aqua-registry-updater init`: seed the state artifact.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use updater_core::config::{Config, Environment};
use updater_engine::init_state;
use updater_store::{OciRegistry, RegistryCredentials, StateStore};

#[derive(Args, Debug)]
pub struct InitArgs {}

impl InitArgs {
    /// The registry is accessed with `GITHUB_TOKEN`.
    pub async fn run(self, root: &Path) -> Result<()> {
        let env = Environment::from_process().context("invalid environment")?;
        let config = Config::load_at(root, &env.repo).context("failed to load the configuration")?;
        let registry = &config.container_registry;
        let artifacts = OciRegistry::new(
            &registry.registry,
            &registry.repository,
            RegistryCredentials::new(registry.username.clone(), env.github_token.clone()),
        );
        let store = StateStore::new(Box::new(artifacts), root);
        init_state(&store)
            .await
            .with_context(|| format!("failed to initialize {}", registry.reference()))?;
        println!("✓ Pushed an empty state to {}:latest", registry.reference());
        Ok(())
    }
}
