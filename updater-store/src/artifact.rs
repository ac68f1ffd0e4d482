//! Artifact storage seam.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::StoreError;

/// A tag-addressed store of single-file artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Content published under `tag`, or `None` if the tag does not exist.
    async fn pull(&self, tag: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Publish `data` under `tag`. The tag moves only once the content is
    /// fully stored.
    async fn push(&self, tag: &str, data: Vec<u8>) -> Result<(), StoreError>;
}

/// In-process [`ArtifactStore`], shared between clones.
///
/// Used by tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryArtifactStore {
    tags: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with `data` under `tag`.
    pub fn with(tag: &str, data: impl Into<Vec<u8>>) -> Self {
        let store = Self::default();
        store.insert(tag, data);
        store
    }

    pub fn insert(&self, tag: &str, data: impl Into<Vec<u8>>) {
        if let Ok(mut tags) = self.tags.lock() {
            tags.insert(tag.to_owned(), data.into());
        }
    }

    /// Current content under `tag`.
    pub fn get(&self, tag: &str) -> Option<Vec<u8>> {
        self.tags.lock().ok()?.get(tag).cloned()
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn pull(&self, tag: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.get(tag))
    }

    async fn push(&self, tag: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.insert(tag, data);
        Ok(())
    }
}
