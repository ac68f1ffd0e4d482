//! `aqua-registry-updater.yaml` and process environment loading.
//!
//! # File shape
//!
//! ```yaml
//! limit: 50                    # optional, 0 or absent means 50
//! container_registry:
//!   registry: ghcr.io          # optional
//!   repository: owner/repo     # optional, defaults to GITHUB_REPOSITORY
//!   auth:
//!     username: octocat        # required
//! ignore_packages:
//!   - owner/repo
//! templates:
//!   pr_title: "chore: update {{.PackageName}} ..."
//! ```
//!
//! Field names are also accepted in their capitalized form (`Limit`,
//! `Registry`, ...) for compatibility with older configuration files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{PackageName, RepoRef};

pub const CONFIG_FILE: &str = "aqua-registry-updater.yaml";
pub const DEFAULT_LIMIT: usize = 50;
pub const DEFAULT_REGISTRY: &str = "ghcr.io";

pub const ENV_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const ENV_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_REGISTRY_TOKEN: &str = "AQUA_REGISTRY_UPDATER_CONTAINER_REGISTRY_TOKEN";

const FOOTER: &str =
    "This pull request was created by [aqua-registry-updater](https://github.com/aquaproj/aqua-registry-updater).";

pub const DEFAULT_PR_TITLE: &str =
    "chore: update {{.PackageName}} {{.CurrentVersion}} to {{.NewVersion}}";
pub const DEFAULT_TRANSFER_PR_TITLE: &str =
    "fix({{.PackageName}}): transfer the repository to {{.NewRepoOwner}}/{{.NewRepoName}}";
pub const DEFAULT_SCAFFOLD_PR_TITLE: &str = "Re-scaffold {{.PackageName}}";

fn default_pr_body() -> String {
    format!("[{{{{.NewVersion}}}}]({{{{.ReleaseURL}}}}) [compare]({{{{.CompareURL}}}})\n\n{FOOTER}")
}

fn default_transfer_pr_body() -> String {
    format!(
        "The GitHub Repository of the package \"{{{{.PackageName}}}}\" was transferred from \
         [{{{{.RepoOwner}}}}/{{{{.RepoName}}}}](https://github.com/{{{{.RepoOwner}}}}/{{{{.RepoName}}}}) to \
         [{{{{.NewRepoOwner}}}}/{{{{.NewRepoName}}}}](https://github.com/{{{{.NewRepoOwner}}}}/{{{{.NewRepoName}}}})\n\n{FOOTER}"
    )
}

fn default_scaffold_pr_body() -> String {
    format!(
        "[registry](https://github.com/aquaproj/aqua-registry/tree/main/pkgs/{{{{.PackageName}}}}) | \
         [repository](https://github.com/{{{{.RepoOwner}}}}/{{{{.RepoName}}}})\n\n\
         The command \"cmdx s {{{{.PackageName}}}}\" was run.\n\n{FOOTER}"
    )
}

// ---------------------------------------------------------------------------
// Raw (as written) shape
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default, alias = "Limit")]
    limit: usize,
    #[serde(default, alias = "ContainerRegistry")]
    container_registry: Option<RawContainerRegistry>,
    #[serde(default, alias = "IgnorePackages")]
    ignore_packages: Vec<String>,
    #[serde(default, alias = "Templates")]
    templates: Option<Templates>,
}

#[derive(Debug, Default, Deserialize)]
struct RawContainerRegistry {
    #[serde(default, alias = "Registry")]
    registry: String,
    #[serde(default, alias = "Repository")]
    repository: String,
    #[serde(default, alias = "Auth")]
    auth: Option<RawAuth>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAuth {
    #[serde(default, alias = "Username")]
    username: String,
}

// ---------------------------------------------------------------------------
// Validated shape
// ---------------------------------------------------------------------------

/// PR title/body template sources. Empty fields are filled with defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Templates {
    #[serde(default)]
    pub pr_title: String,
    #[serde(default)]
    pub pr_body: String,
    #[serde(default)]
    pub transfer_pr_title: String,
    #[serde(default)]
    pub transfer_pr_body: String,
    #[serde(default)]
    pub scaffold_pr_title: String,
    #[serde(default)]
    pub scaffold_pr_body: String,
}

impl Templates {
    /// Templates with every field set to its default.
    pub fn defaults() -> Self {
        let mut templates = Self::default();
        templates.fill_defaults();
        templates
    }

    fn fill_defaults(&mut self) {
        fill(&mut self.pr_title, || DEFAULT_PR_TITLE.to_owned());
        fill(&mut self.pr_body, default_pr_body);
        fill(&mut self.transfer_pr_title, || DEFAULT_TRANSFER_PR_TITLE.to_owned());
        fill(&mut self.transfer_pr_body, default_transfer_pr_body);
        fill(&mut self.scaffold_pr_title, || DEFAULT_SCAFFOLD_PR_TITLE.to_owned());
        fill(&mut self.scaffold_pr_body, default_scaffold_pr_body);
    }
}

fn fill(field: &mut String, default: impl FnOnce() -> String) {
    if field.is_empty() {
        *field = default();
    }
}

/// Where the state artifact lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerRegistry {
    pub registry: String,
    pub repository: String,
    pub username: String,
}

impl ContainerRegistry {
    /// `<registry>/<repository>`, e.g. `ghcr.io/aquaproj/aqua-registry`.
    pub fn reference(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }
}

/// Validated run configuration. Immutable for the duration of a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub limit: usize,
    pub container_registry: ContainerRegistry,
    pub ignore_packages: HashSet<PackageName>,
    pub templates: Templates,
}

impl Config {
    /// Load `<root>/aqua-registry-updater.yaml` and apply defaults.
    pub fn load_at(root: &Path, repo: &RepoRef) -> Result<Self, ConfigError> {
        let path = config_path_at(root);
        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        Self::parse(&contents, &path, repo)
    }

    /// Parse YAML text; `path` is only used for error context.
    pub fn parse(contents: &str, path: &Path, repo: &RepoRef) -> Result<Self, ConfigError> {
        let raw: RawConfig = if contents.trim().is_empty() {
            RawConfig::default()
        } else {
            serde_yaml::from_str(contents).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        };
        Self::from_raw(raw, repo)
    }

    fn from_raw(raw: RawConfig, repo: &RepoRef) -> Result<Self, ConfigError> {
        let registry = raw
            .container_registry
            .ok_or(ConfigError::Missing("container_registry"))?;
        let auth = registry
            .auth
            .ok_or(ConfigError::Missing("container_registry.auth"))?;
        if auth.username.is_empty() {
            return Err(ConfigError::Missing("container_registry.auth.username"));
        }

        let mut templates = raw.templates.unwrap_or_default();
        templates.fill_defaults();

        Ok(Self {
            limit: if raw.limit == 0 { DEFAULT_LIMIT } else { raw.limit },
            container_registry: ContainerRegistry {
                registry: non_empty_or(registry.registry, DEFAULT_REGISTRY),
                repository: non_empty_or(registry.repository, &repo.to_string()),
                username: auth.username,
            },
            ignore_packages: raw.ignore_packages.into_iter().map(PackageName::from).collect(),
            templates,
        })
    }

    pub fn is_ignored(&self, name: &PackageName) -> bool {
        self.ignore_packages.contains(name)
    }
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.is_empty() {
        default.to_owned()
    } else {
        value
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Values the bot reads from its process environment.
#[derive(Debug, Clone)]
pub struct Environment {
    pub repo: RepoRef,
    pub github_token: String,
    pub registry_token: Option<String>,
}

impl Environment {
    /// Read from the real process environment.
    pub fn from_process() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read through `lookup`; empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let repo: RepoRef = get(ENV_REPOSITORY)
            .ok_or(ConfigError::MissingEnv(ENV_REPOSITORY))?
            .parse()?;
        let github_token = get(ENV_GITHUB_TOKEN).ok_or(ConfigError::MissingEnv(ENV_GITHUB_TOKEN))?;
        Ok(Self {
            repo,
            github_token,
            registry_token: get(ENV_REGISTRY_TOKEN),
        })
    }

    /// Registry token, required by `update`.
    pub fn require_registry_token(&self) -> Result<&str, ConfigError> {
        self.registry_token
            .as_deref()
            .ok_or(ConfigError::MissingEnv(ENV_REGISTRY_TOKEN))
    }
}

/// Path of the config file under `root`.
pub fn config_path_at(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn repo() -> RepoRef {
        "aquaproj/aqua-registry".parse().expect("repo")
    }

    fn parse(yaml: &str) -> Result<Config, ConfigError> {
        Config::parse(yaml, Path::new(CONFIG_FILE), &repo())
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let cfg = parse("container_registry:\n  auth:\n    username: octocat\n").expect("parse");
        assert_eq!(cfg.limit, DEFAULT_LIMIT);
        assert_eq!(cfg.container_registry.registry, "ghcr.io");
        assert_eq!(cfg.container_registry.repository, "aquaproj/aqua-registry");
        assert_eq!(cfg.container_registry.username, "octocat");
        assert_eq!(
            cfg.container_registry.reference(),
            "ghcr.io/aquaproj/aqua-registry"
        );
        assert_eq!(cfg.templates, Templates::defaults());
        assert!(cfg.ignore_packages.is_empty());
    }

    #[test]
    fn capitalized_keys_are_accepted() {
        let yaml = "Limit: 7\ncontainer_registry:\n  Registry: registry.example.com\n  Repository: me/state\n  Auth:\n    Username: bot\n";
        let cfg = parse(yaml).expect("parse");
        assert_eq!(cfg.limit, 7);
        assert_eq!(cfg.container_registry.reference(), "registry.example.com/me/state");
        assert_eq!(cfg.container_registry.username, "bot");
    }

    #[test]
    fn zero_limit_means_default() {
        let cfg = parse("limit: 0\ncontainer_registry:\n  auth:\n    username: u\n").expect("parse");
        assert_eq!(cfg.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn ignore_packages_and_custom_templates() {
        let yaml = "container_registry:\n  auth:\n    username: u\nignore_packages:\n  - a/b\ntemplates:\n  pr_title: 'bump {{.PackageName}}'\n";
        let cfg = parse(yaml).expect("parse");
        assert!(cfg.is_ignored(&PackageName::from("a/b")));
        assert!(!cfg.is_ignored(&PackageName::from("a/c")));
        assert_eq!(cfg.templates.pr_title, "bump {{.PackageName}}");
        assert_eq!(cfg.templates.pr_body, default_pr_body());
    }

    #[test]
    fn missing_registry_is_rejected() {
        let err = parse("limit: 3\n").unwrap_err();
        assert!(matches!(err, ConfigError::Missing("container_registry")), "got: {err}");
        let err = parse("").unwrap_err();
        assert!(matches!(err, ConfigError::Missing("container_registry")), "got: {err}");
    }

    #[test]
    fn missing_auth_and_username_are_rejected() {
        let err = parse("container_registry:\n  registry: ghcr.io\n").unwrap_err();
        assert!(matches!(err, ConfigError::Missing("container_registry.auth")), "got: {err}");

        let err = parse("container_registry:\n  auth:\n    username: ''\n").unwrap_err();
        assert!(err.to_string().contains("container_registry.auth.username is required"));
    }

    #[test]
    fn malformed_yaml_reports_path() {
        let err = parse("limit: [unclosed").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains(CONFIG_FILE));
    }

    #[test]
    fn default_templates_reference_expected_fields() {
        let t = Templates::defaults();
        assert!(t.pr_body.starts_with("[{{.NewVersion}}]({{.ReleaseURL}}) [compare]({{.CompareURL}})"));
        assert!(t.transfer_pr_body.contains("https://github.com/{{.NewRepoOwner}}/{{.NewRepoName}}"));
        assert!(t.scaffold_pr_body.contains("cmdx s {{.PackageName}}"));
        assert!(t.pr_body.ends_with(FOOTER));
    }

    #[test]
    fn environment_requires_repository_and_token() {
        let vars: HashMap<&str, &str> = HashMap::from([(ENV_GITHUB_TOKEN, "t")]);
        let err = Environment::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(ENV_REPOSITORY)));

        let vars: HashMap<&str, &str> = HashMap::from([(ENV_REPOSITORY, "noslash"), (ENV_GITHUB_TOKEN, "t")]);
        let err = Environment::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRepository { .. }));
    }

    #[test]
    fn environment_registry_token_is_optional_until_required() {
        let vars: HashMap<&str, &str> =
            HashMap::from([(ENV_REPOSITORY, "o/r"), (ENV_GITHUB_TOKEN, "t"), (ENV_REGISTRY_TOKEN, "")]);
        let env = Environment::from_lookup(|k| vars.get(k).map(|v| v.to_string())).expect("env");
        assert_eq!(env.repo.to_string(), "o/r");
        assert!(env.registry_token.is_none());
        assert!(matches!(
            env.require_registry_token(),
            Err(ConfigError::MissingEnv(ENV_REGISTRY_TOKEN))
        ));
    }
}
