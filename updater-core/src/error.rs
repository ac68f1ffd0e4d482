//! Error types for updater-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading configuration or the process environment.
///
/// Every variant is fatal: the run aborts before any side effect.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid YAML for the expected shape.
    #[error("failed to parse configuration file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A required configuration field is absent or empty.
    #[error("{0} is required")]
    Missing(&'static str),

    /// A required environment variable is unset or empty.
    #[error("environment variable {0} is required")]
    MissingEnv(&'static str),

    /// `GITHUB_REPOSITORY`-style value without an `owner/name` shape.
    #[error("{name} must be of the form owner/repo, got '{value}'")]
    InvalidRepository { name: &'static str, value: String },
}

/// A version token without a parsable semantic-version suffix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("no semantic version found in '{0}'")]
    Parse(String),
}

/// Errors from reading the pinned version line of a package definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("no `- name: {package}@<version>` line found")]
    NotFound { package: String },
}

/// Errors from walking or rewriting the `pkgs/` tree.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAML serialization error: {0}")]
    Serialize(#[from] serde_yaml::Error),

    /// Relocation target is already occupied.
    #[error("package directory {0} already exists")]
    AlreadyExists(PathBuf),

    /// Relocation source does not exist.
    #[error("package directory {0} not found")]
    NotFound(PathBuf),
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> TreeError {
    TreeError::Io {
        path: path.into(),
        source,
    }
}
