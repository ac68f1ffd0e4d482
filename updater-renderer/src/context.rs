//! Template context: the serializable payload PR templates render against.
//!
//! Field names are the ones configuration files reference
//! (`{{.PackageName}}`, `{{.CompareURL}}`, ...), so they are serialized in
//! PascalCase with the two URL fields spelled out explicitly.

use serde::{Deserialize, Serialize};

use updater_core::{PackageName, RepoCoordinates};

use crate::error::RenderError;

/// Flat rendering payload shared by update and transfer templates.
///
/// Fields that do not apply to a template are left empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateContext {
    pub package_name: String,
    pub repo_owner: String,
    pub repo_name: String,
    #[serde(rename = "CompareURL")]
    pub compare_url: String,
    #[serde(rename = "ReleaseURL")]
    pub release_url: String,
    pub current_version: String,
    pub new_version: String,
    pub new_repo_owner: String,
    pub new_repo_name: String,
    pub new_package_name: String,
}

impl TemplateContext {
    /// Context for a version update PR.
    ///
    /// Packages hosted outside GitHub (owner containing a dot) get a degraded
    /// context: owner, repo, and both URLs stay empty.
    pub fn for_update(name: &PackageName, current_version: &str, new_version: &str) -> Self {
        let mut ctx = Self {
            package_name: name.to_string(),
            current_version: current_version.to_owned(),
            new_version: new_version.to_owned(),
            ..Self::default()
        };
        if let Some(repo) = name.repo_coordinates().filter(RepoCoordinates::is_github) {
            ctx.compare_url = format!(
                "https://github.com/{}/{}/compare/{current_version}...{new_version}",
                repo.owner, repo.repo
            );
            ctx.release_url = format!(
                "https://github.com/{}/{}/releases/tag/{new_version}",
                repo.owner, repo.repo
            );
            ctx.repo_owner = repo.owner;
            ctx.repo_name = repo.repo;
        }
        ctx
    }

    /// Context for a repository transfer PR.
    pub fn for_transfer(
        name: &PackageName,
        from: &RepoCoordinates,
        to: &RepoCoordinates,
        new_name: &PackageName,
    ) -> Self {
        Self {
            package_name: name.to_string(),
            repo_owner: from.owner.clone(),
            repo_name: from.repo.clone(),
            new_repo_owner: to.owner.clone(),
            new_repo_name: to.repo.clone(),
            new_package_name: new_name.to_string(),
            ..Self::default()
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coords(owner: &str, repo: &str) -> RepoCoordinates {
        RepoCoordinates {
            owner: owner.to_owned(),
            repo: repo.to_owned(),
        }
    }

    #[test]
    fn update_context_builds_github_urls() {
        let ctx = TemplateContext::for_update(&PackageName::from("cli/cli/gh"), "v2.0.0", "v2.1.0");
        assert_eq!(ctx.package_name, "cli/cli/gh");
        assert_eq!(ctx.repo_owner, "cli");
        assert_eq!(ctx.repo_name, "cli");
        assert_eq!(ctx.compare_url, "https://github.com/cli/cli/compare/v2.0.0...v2.1.0");
        assert_eq!(ctx.release_url, "https://github.com/cli/cli/releases/tag/v2.1.0");
    }

    #[test]
    fn non_github_owner_degrades_context() {
        let ctx = TemplateContext::for_update(&PackageName::from("gitlab.com/x/y"), "1.0", "1.1");
        assert_eq!(ctx.package_name, "gitlab.com/x/y");
        assert_eq!(ctx.new_version, "1.1");
        assert!(ctx.repo_owner.is_empty());
        assert!(ctx.repo_name.is_empty());
        assert!(ctx.compare_url.is_empty());
        assert!(ctx.release_url.is_empty());
    }

    #[test]
    fn serialized_keys_match_template_fields() {
        let ctx = TemplateContext::for_transfer(
            &PackageName::from("old/tool"),
            &coords("old", "tool"),
            &coords("new", "tool"),
            &PackageName::from("new/tool"),
        );
        let value = serde_json::to_value(&ctx).expect("serialize");
        for key in [
            "PackageName",
            "RepoOwner",
            "RepoName",
            "CompareURL",
            "ReleaseURL",
            "CurrentVersion",
            "NewVersion",
            "NewRepoOwner",
            "NewRepoName",
            "NewPackageName",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["NewPackageName"], "new/tool");
        assert_eq!(value["RepoOwner"], "old");
    }
}
