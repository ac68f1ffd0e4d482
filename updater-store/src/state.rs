//! The persisted state document.
//!
//! Persists a [`StateDocument`] JSON file at `<dir>/data.json`:
//!
//! ```json
//! { "packages": [ { "name": "cli/cli" } ] }
//! ```
//!
//! Writes use the atomic `.tmp` + rename pattern.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use updater_core::Package;

use crate::error::{io_err, StoreError};

/// Local file name of the state document, also the artifact layer title.
pub const STATE_FILE: &str = "data.json";

/// Registry tag the state artifact is published under.
pub const STATE_TAG: &str = "latest";

/// On-disk / on-registry state payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDocument {
    /// `null` (as written by older deployments for an empty list) reads as empty.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub packages: Vec<Package>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Package>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Package>>::deserialize(deserializer)?.unwrap_or_default())
}

impl StateDocument {
    pub fn new(packages: Vec<Package>) -> Self {
        Self { packages }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }
}

/// `<dir>/data.json`
pub fn state_path_at(dir: &Path) -> PathBuf {
    dir.join(STATE_FILE)
}

/// Load the working copy. A missing file is an empty document.
pub fn load_at(dir: &Path) -> Result<StateDocument, StoreError> {
    let path = state_path_at(dir);
    if !path.exists() {
        return Ok(StateDocument::default());
    }
    let bytes = std::fs::read(&path).map_err(|e| io_err(&path, e))?;
    StateDocument::from_slice(&bytes)
}

/// Write raw document bytes to the working copy atomically.
pub fn write_bytes_at(dir: &Path, bytes: &[u8]) -> Result<PathBuf, StoreError> {
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
    let path = state_path_at(dir);
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(path)
}

/// Serialize `doc` and write it to the working copy atomically. Returns the
/// bytes written.
pub fn save_at(dir: &Path, doc: &StateDocument) -> Result<Vec<u8>, StoreError> {
    let bytes = doc.to_bytes()?;
    write_bytes_at(dir, &bytes)?;
    Ok(bytes)
}
