//! Updater core library: domain types, configuration, and the pure helpers
//! the update engine is built on.
//!
//! - [`types`]: package names, repository coordinates
//! - [`config`]: `aqua-registry-updater.yaml` and environment loading
//! - [`version`]: prefix-aware version comparison
//! - [`codec`]: the pinned `- name: <pkg>@<version>` line of `pkg.yaml`
//! - [`tree`]: `pkgs/` discovery, package relocation, index regeneration
//! - [`error`]: error enums for all of the above

pub mod codec;
pub mod config;
pub mod error;
pub mod tree;
pub mod types;
pub mod version;

pub use error::{CodecError, ConfigError, TreeError, VersionError};
pub use types::{Package, PackageList, PackageName, RepoCoordinates, RepoRef};
