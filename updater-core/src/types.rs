//! Domain types shared by every updater crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Slash-separated package identifier: `owner/repo[/subpath]`.
///
/// Matches the directory of the package definition under `pkgs/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(pub String);

impl PackageName {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Owner and repository segments of the name.
    ///
    /// `None` when the name has no `/` or either segment is empty.
    pub fn repo_coordinates(&self) -> Option<RepoCoordinates> {
        let (owner, rest) = self.0.split_once('/')?;
        let repo = rest.split('/').next().unwrap_or(rest);
        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some(RepoCoordinates {
            owner: owner.to_owned(),
            repo: repo.to_owned(),
        })
    }

    /// Everything after `owner/repo`, including the leading `/` (may be empty).
    pub fn subpath(&self) -> &str {
        let mut slashes = self.0.match_indices('/');
        match slashes.nth(1) {
            Some((idx, _)) => &self.0[idx..],
            None => "",
        }
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for PackageName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for PackageName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Repository coordinates
// ---------------------------------------------------------------------------

/// `owner/repo` of an upstream source repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoCoordinates {
    pub owner: String,
    pub repo: String,
}

impl RepoCoordinates {
    /// Owners containing a dot (`golang.org`, `gitlab.com`, ...) are not
    /// GitHub accounts.
    pub fn is_github(&self) -> bool {
        !self.owner.contains('.')
    }

    pub fn same_repository(&self, other: &RepoCoordinates) -> bool {
        self.owner.eq_ignore_ascii_case(&other.owner) && self.repo.eq_ignore_ascii_case(&other.repo)
    }
}

impl fmt::Display for RepoCoordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// The registry repository the bot maintains (from `GITHUB_REPOSITORY`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    owner: owner.to_owned(),
                    name: name.to_owned(),
                })
            }
            _ => Err(ConfigError::InvalidRepository {
                name: "GITHUB_REPOSITORY",
                value: s.to_owned(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A package known to the updater's persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: PackageName,
}

impl Package {
    pub fn new(name: impl Into<PackageName>) -> Self {
        Self { name: name.into() }
    }
}

/// Ordered package list; the order is the rotation order.
pub type PackageList = Vec<Package>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_take_first_two_segments() {
        let name = PackageName::from("kubernetes/kubectl/sub");
        let coords = name.repo_coordinates().expect("coordinates");
        assert_eq!(coords.owner, "kubernetes");
        assert_eq!(coords.repo, "kubectl");
        assert_eq!(name.subpath(), "/sub");
    }

    #[test]
    fn name_without_slash_has_no_coordinates() {
        assert!(PackageName::from("standalone").repo_coordinates().is_none());
        assert!(PackageName::from("owner/").repo_coordinates().is_none());
        assert_eq!(PackageName::from("a/b").subpath(), "");
    }

    #[test]
    fn dotted_owner_is_not_github() {
        let coords = PackageName::from("golang.org/x/tools")
            .repo_coordinates()
            .expect("coordinates");
        assert!(!coords.is_github());
        assert!(PackageName::from("cli/cli")
            .repo_coordinates()
            .expect("coordinates")
            .is_github());
    }

    #[test]
    fn repo_ref_parses_owner_and_name() {
        let repo: RepoRef = "aquaproj/aqua-registry".parse().expect("parse");
        assert_eq!(repo.owner, "aquaproj");
        assert_eq!(repo.name, "aqua-registry");
        assert_eq!(repo.to_string(), "aquaproj/aqua-registry");
    }

    #[test]
    fn repo_ref_rejects_malformed_values() {
        for value in ["", "noslash", "/name", "owner/", "a/b/c"] {
            assert!(value.parse::<RepoRef>().is_err(), "accepted '{value}'");
        }
    }

    #[test]
    fn package_serializes_as_name_object() {
        let json = serde_yaml::to_string(&Package::new("a/b")).expect("serialize");
        assert_eq!(json.trim(), "name: a/b");
    }
}
