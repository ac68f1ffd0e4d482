//! The registry source tree.
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   registry.yaml                 (index of every package's registry entries)
//!   pkgs/
//!     <owner>/<repo>[/<sub>]/
//!       pkg.yaml                  (pinned `- name: <pkg>@<version>` line)
//!       registry.yaml             (this package's registry entries)
//! ```
//!
//! Discovery matches file names only; file contents are never parsed here
//! except by [`regenerate_index_at`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::{io_err, TreeError};
use crate::types::{PackageName, RepoCoordinates};

pub const PKGS_DIR: &str = "pkgs";
pub const DEFINITION_FILE: &str = "pkg.yaml";
pub const REGISTRY_FILE: &str = "registry.yaml";

const INDEX_HEADER: &str = "# yaml-language-server: $schema=https://raw.githubusercontent.com/aquaproj/aqua/main/json-schema/registry.json\n";

// ---------------------------------------------------------------------------
// 1. Path helpers
// ---------------------------------------------------------------------------

/// `pkgs/<name>` relative to the tree root. Pure, no I/O.
pub fn package_dir(name: &PackageName) -> PathBuf {
    name.as_str()
        .split('/')
        .fold(PathBuf::from(PKGS_DIR), |dir, segment| dir.join(segment))
}

/// `pkgs/<name>/pkg.yaml` relative to the tree root.
pub fn definition_path(name: &PackageName) -> PathBuf {
    package_dir(name).join(DEFINITION_FILE)
}

/// `<root>/pkgs/<name>/pkg.yaml`.
pub fn definition_path_at(root: &Path, name: &PackageName) -> PathBuf {
    root.join(definition_path(name))
}

// ---------------------------------------------------------------------------
// 2. Discovery
// ---------------------------------------------------------------------------

/// Every package with a `pkg.yaml` under `<root>/pkgs`, in sorted path order.
///
/// A missing `pkgs/` yields an empty list. Unreadable entries are logged and
/// skipped so one bad directory does not hide the rest of the tree.
pub fn discover_at(root: &Path) -> Result<Vec<PackageName>, TreeError> {
    let pkgs = root.join(PKGS_DIR);
    if !pkgs.exists() {
        return Ok(vec![]);
    }

    let mut names = Vec::new();
    for entry in WalkDir::new(&pkgs).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable entry under pkgs");
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.file_name() != DEFINITION_FILE {
            continue;
        }
        let Some(dir) = entry.path().parent() else { continue };
        let Ok(relative) = dir.strip_prefix(&pkgs) else { continue };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        if !name.is_empty() {
            names.push(PackageName::from(name));
        }
    }
    Ok(names)
}

// ---------------------------------------------------------------------------
// 3. Relocation
// ---------------------------------------------------------------------------

/// Files touched by [`relocate_at`], relative to the tree root.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Relocation {
    pub removed: Vec<PathBuf>,
    pub added: Vec<PathBuf>,
}

/// Move the files of `pkgs/<from>` to `pkgs/<to>` and point them at the new
/// repository.
///
/// Only the package's own files move. A subdirectory holding its own
/// `pkg.yaml` is a separate package with its own state entry; it stays
/// under the old path until it is relocated itself.
///
/// Inside `pkg.yaml` and `registry.yaml`, `<old_owner>/<old_repo>` becomes
/// `<new_owner>/<new_repo>` and `repo_owner` / `repo_name` values naming the
/// old repository are rewritten. Emptied directories are pruned.
pub fn relocate_at(
    root: &Path,
    from: &PackageName,
    to: &PackageName,
) -> Result<Relocation, TreeError> {
    let src = root.join(package_dir(from));
    let dst = root.join(package_dir(to));
    if !src.is_dir() {
        return Err(TreeError::NotFound(src));
    }
    if dst.join(DEFINITION_FILE).exists() {
        return Err(TreeError::AlreadyExists(dst));
    }

    let files = own_files(&src)?;
    if let Some(taken) = files.iter().map(|f| dst.join(f)).find(|p| p.exists()) {
        return Err(TreeError::AlreadyExists(taken));
    }

    let mut relocation = Relocation::default();
    for relative in files {
        let (old, new) = (src.join(&relative), dst.join(&relative));
        if let Some(parent) = new.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
        std::fs::rename(&old, &new).map_err(|e| io_err(&old, e))?;
        relocation.removed.push(package_dir(from).join(&relative));
        relocation.added.push(package_dir(to).join(&relative));
    }

    if let (Some(old), Some(new)) = (from.repo_coordinates(), to.repo_coordinates()) {
        for name in [DEFINITION_FILE, REGISTRY_FILE] {
            let path = dst.join(name);
            if !path.exists() {
                continue;
            }
            let content = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
            let rewritten = rewrite_references(&content, &old, &new);
            if rewritten != content {
                write_atomic(&path, &rewritten)?;
            }
        }
    }

    prune_empty_dirs(root, &src)?;
    Ok(relocation)
}

/// Files under `dir`, relative to it, skipping nested package directories.
fn own_files(dir: &Path) -> Result<Vec<PathBuf>, TreeError> {
    let walker = WalkDir::new(dir).sort_by_file_name().into_iter().filter_entry(|e| {
        e.depth() == 0 || !(e.file_type().is_dir() && e.path().join(DEFINITION_FILE).is_file())
    });
    let mut files = Vec::new();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            io_err(path, std::io::Error::other(e.to_string()))
        })?;
        if entry.file_type().is_file() {
            if let Ok(relative) = entry.path().strip_prefix(dir) {
                files.push(relative.to_path_buf());
            }
        }
    }
    Ok(files)
}

/// Remove empty directories under and including `dir`, then its emptied
/// parents up to `pkgs/`.
fn prune_empty_dirs(root: &Path, dir: &Path) -> Result<(), TreeError> {
    for entry in WalkDir::new(dir).contents_first(true) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            io_err(path, std::io::Error::other(e.to_string()))
        })?;
        if entry.file_type().is_dir() && entry.depth() > 0 && is_empty_dir(entry.path())? {
            std::fs::remove_dir(entry.path()).map_err(|e| io_err(entry.path(), e))?;
        }
    }

    let stop = root.join(PKGS_DIR);
    let mut current = Some(dir);
    while let Some(dir) = current {
        if dir == stop || !dir.starts_with(&stop) || !is_empty_dir(dir)? {
            break;
        }
        std::fs::remove_dir(dir).map_err(|e| io_err(dir, e))?;
        current = dir.parent();
    }
    Ok(())
}

fn is_empty_dir(dir: &Path) -> Result<bool, TreeError> {
    Ok(std::fs::read_dir(dir)
        .map_err(|e| io_err(dir, e))?
        .next()
        .is_none())
}

fn rewrite_references(content: &str, old: &RepoCoordinates, new: &RepoCoordinates) -> String {
    let replaced = content.replace(&old.to_string(), &new.to_string());
    replaced
        .split('\n')
        .map(|line| {
            rewrite_key(line, "repo_owner", &old.owner, &new.owner)
                .or_else(|| rewrite_key(line, "repo_name", &old.repo, &new.repo))
                .unwrap_or_else(|| line.to_owned())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `<lead>key: old` → `<lead>key: new`, where `<lead>` is indentation and an
/// optional list dash.
fn rewrite_key(line: &str, key: &str, old: &str, new: &str) -> Option<String> {
    let body = line.trim_start();
    let body = body.strip_prefix("- ").unwrap_or(body).trim_start();
    let lead = &line[..line.len() - body.len()];
    let value = body.strip_prefix(key)?.strip_prefix(':')?;
    if value.trim() != old {
        return None;
    }
    Some(format!("{lead}{key}: {new}"))
}

// ---------------------------------------------------------------------------
// 4. Registry index
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    packages: Vec<serde_yaml::Value>,
}

/// Rebuild `<root>/registry.yaml` from every `pkgs/**/registry.yaml`.
///
/// Entries keep the order of the sorted tree walk. Returns the index path.
pub fn regenerate_index_at(root: &Path) -> Result<PathBuf, TreeError> {
    let pkgs = root.join(PKGS_DIR);
    let mut index = RegistryDocument::default();

    if pkgs.exists() {
        for entry in WalkDir::new(&pkgs).sort_by_file_name() {
            let entry = entry.map_err(|e| io_err(&pkgs, std::io::Error::other(e.to_string())))?;
            if !entry.file_type().is_file() || entry.file_name() != REGISTRY_FILE {
                continue;
            }
            let path = entry.path();
            let content = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
            if content.trim().is_empty() {
                continue;
            }
            let doc: RegistryDocument =
                serde_yaml::from_str(&content).map_err(|source| TreeError::Yaml {
                    path: path.to_path_buf(),
                    source,
                })?;
            index.packages.extend(doc.packages);
        }
    }

    let path = root.join(REGISTRY_FILE);
    let yaml = serde_yaml::to_string(&index)?;
    write_atomic(&path, &format!("{INDEX_HEADER}{yaml}"))?;
    Ok(path)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

/// serialize → `<file>.tmp` sibling → `rename`.
fn write_atomic(path: &Path, content: &str) -> Result<(), TreeError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!("{file_name}.tmp"));
    std::fs::write(&tmp, content).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
