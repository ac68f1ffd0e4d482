//! Pull-before-run / push-after-run state handling.

use std::path::{Path, PathBuf};

use tracing::info;

use updater_core::{Package, PackageList};

use crate::artifact::ArtifactStore;
use crate::error::StoreError;
use crate::state::{self, StateDocument, STATE_TAG};

/// The package list as persisted between runs.
///
/// Every pulled or pushed document also lands in `<work_dir>/data.json`.
pub struct StateStore {
    artifacts: Box<dyn ArtifactStore>,
    work_dir: PathBuf,
}

impl StateStore {
    pub fn new(artifacts: Box<dyn ArtifactStore>, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifacts,
            work_dir: work_dir.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Fetch the list published under `latest`. A missing tag is an empty
    /// list, not an error.
    pub async fn pull(&self) -> Result<PackageList, StoreError> {
        let Some(bytes) = self.artifacts.pull(STATE_TAG).await? else {
            info!(tag = STATE_TAG, "no state artifact found, starting from an empty list");
            return Ok(vec![]);
        };
        let path = state::write_bytes_at(&self.work_dir, &bytes)?;
        let doc = StateDocument::from_slice(&bytes)?;
        info!(
            num_of_packages = doc.packages.len(),
            path = %path.display(),
            "read state"
        );
        Ok(doc.packages)
    }

    /// Write `packages` to the working copy, then publish it under `latest`.
    pub async fn push(&self, packages: &[Package]) -> Result<(), StoreError> {
        let doc = StateDocument::new(packages.to_vec());
        let bytes = state::save_at(&self.work_dir, &doc)?;
        info!(num_of_packages = packages.len(), "pushing state to the container registry");
        self.artifacts.push(STATE_TAG, bytes).await
    }
}
