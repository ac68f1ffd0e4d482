//! Error types for updater-store.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while reading or writing the persisted state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An I/O error on the local working copy, with annotated path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The state document or a registry response is not valid JSON.
    #[error("state JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The registry could not be reached.
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    /// The registry answered with an unexpected status.
    #[error("{method} {url} returned HTTP {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },

    /// Credentials were rejected or the auth challenge could not be met.
    #[error("registry authentication failed: {0}")]
    Auth(String),

    /// A downloaded blob does not hash to the digest it was requested by.
    #[error("digest mismatch: expected {expected}, got {actual}")]
    Digest { expected: String, actual: String },

    /// The manifest carries no layer for the state file.
    #[error("artifact {reference} has no {file} layer")]
    MissingLayer { reference: String, file: String },

    /// A blocking registry call panicked or was aborted.
    #[error("background registry task failed: {0}")]
    Background(String),
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
