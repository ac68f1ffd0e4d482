//! # updater-store
//!
//! Durable package list for the updater. The list is kept as a one-file OCI
//! artifact (`data.json`, tag `latest`) so that consecutive runs resume the
//! rotation where the previous one stopped.
//!
//! - [`state`]: the `data.json` document and its local working copy
//! - [`artifact`]: the [`ArtifactStore`] seam plus an in-memory implementation
//! - [`oci`]: [`OciRegistry`], the OCI distribution API client
//! - [`store`]: [`StateStore`], pull-before-run / push-after-run

pub mod artifact;
pub mod error;
pub mod oci;
pub mod state;
pub mod store;

pub use artifact::{ArtifactStore, MemoryArtifactStore};
pub use error::StoreError;
pub use oci::{OciRegistry, RegistryCredentials};
pub use state::StateDocument;
pub use store::StateStore;
