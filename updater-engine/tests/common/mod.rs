//! In-memory collaborators and a package tree fixture shared by the engine
//! integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use assert_fs::prelude::*;
use async_trait::async_trait;

use updater_core::{PackageName, RepoCoordinates, RepoRef};
use updater_engine::orchestrator::prepare;
use updater_engine::{
    Collaborators, CommitRequest, NewPullRequest, Orchestrator, PullRequestService, RepositoryProbe,
    ToolError, Toolchain,
};
use updater_store::{ArtifactStore, MemoryArtifactStore, StateDocument, StateStore, StoreError};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Everything the fakes were asked to do, in order.
#[derive(Debug, Default)]
pub struct Calls {
    pub generated: Vec<String>,
    pub commits: Vec<CommitRequest>,
    pub pulls: Vec<NewPullRequest>,
    pub merges: Vec<u64>,
    pub probed: Vec<String>,
}

pub type Recorder = Arc<Mutex<Calls>>;

#[derive(Clone, Default)]
pub struct FakeToolchain {
    /// Package name to generator output; unknown packages fail.
    pub latest: HashMap<String, String>,
    pub fail_merge: bool,
    pub fail_commit: bool,
    pub calls: Recorder,
}

#[async_trait]
impl Toolchain for FakeToolchain {
    async fn generate_latest(&self, package: &PackageName) -> Result<String, ToolError> {
        self.calls.lock().unwrap().generated.push(package.to_string());
        self.latest
            .get(package.as_str())
            .cloned()
            .ok_or_else(|| ToolError::Exit {
                program: "aqua",
                status: "exit status: 1".to_owned(),
                stderr: format!("unknown package {package}"),
            })
    }

    async fn create_branch_with_commit(&self, request: &CommitRequest) -> Result<(), ToolError> {
        if self.fail_commit {
            return Err(ToolError::Exit {
                program: "ghcp",
                status: "exit status: 1".to_owned(),
                stderr: "rejected".to_owned(),
            });
        }
        self.calls.lock().unwrap().commits.push(request.clone());
        Ok(())
    }

    async fn request_auto_merge(&self, number: u64) -> Result<(), ToolError> {
        if self.fail_merge {
            return Err(ToolError::Exit {
                program: "gh",
                status: "exit status: 1".to_owned(),
                stderr: "auto-merge is not allowed".to_owned(),
            });
        }
        self.calls.lock().unwrap().merges.push(number);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakePulls {
    pub calls: Recorder,
}

#[async_trait]
impl PullRequestService for FakePulls {
    async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<u64, ToolError> {
        let mut calls = self.calls.lock().unwrap();
        calls.pulls.push(pr.clone());
        Ok(100 + calls.pulls.len() as u64)
    }
}

#[derive(Clone, Default)]
pub struct FakeProbe {
    /// `owner/repo` to `Location`.
    pub locations: HashMap<String, String>,
    pub calls: Recorder,
}

#[async_trait]
impl RepositoryProbe for FakeProbe {
    async fn redirect_location(&self, repo: &RepoCoordinates) -> Result<Option<String>, ToolError> {
        self.calls.lock().unwrap().probed.push(repo.to_string());
        Ok(self.locations.get(&repo.to_string()).cloned())
    }
}

/// Pulls like the wrapped store, fails every push.
pub struct FailingPush(pub MemoryArtifactStore);

#[async_trait]
impl ArtifactStore for FailingPush {
    async fn pull(&self, tag: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.0.pull(tag).await
    }

    async fn push(&self, _tag: &str, _data: Vec<u8>) -> Result<(), StoreError> {
        Err(StoreError::Status {
            method: "PUT",
            url: "https://registry.test/v2/state/manifests/latest".to_owned(),
            status: 503,
            body: "unavailable".to_owned(),
        })
    }
}

// ---------------------------------------------------------------------------
// Fixture
// ---------------------------------------------------------------------------

pub struct Fixture {
    pub root: assert_fs::TempDir,
    pub remote: MemoryArtifactStore,
    pub toolchain: FakeToolchain,
    pub pulls: FakePulls,
    pub probe: FakeProbe,
    pub calls: Recorder,
}

impl Fixture {
    /// Empty tree with a config file allowing `limit` packages per run.
    pub fn new(limit: usize, ignore: &[&str]) -> Self {
        let root = assert_fs::TempDir::new().expect("tempdir");
        let mut yaml = format!("limit: {limit}\ncontainer_registry:\n  auth:\n    username: bot\n");
        if !ignore.is_empty() {
            yaml.push_str("ignore_packages:\n");
            for name in ignore {
                yaml.push_str(&format!("  - {name}\n"));
            }
        }
        root.child("aqua-registry-updater.yaml")
            .write_str(&yaml)
            .expect("write config");

        let calls = Recorder::default();
        Self {
            root,
            remote: MemoryArtifactStore::new(),
            toolchain: FakeToolchain {
                calls: calls.clone(),
                ..FakeToolchain::default()
            },
            pulls: FakePulls { calls: calls.clone() },
            probe: FakeProbe {
                calls: calls.clone(),
                ..FakeProbe::default()
            },
            calls,
        }
    }

    /// `pkgs/<name>/pkg.yaml` pinned to `version`, plus its registry.yaml.
    pub fn package(&self, name: &str, version: &str) -> &Self {
        self.root
            .child(format!("pkgs/{name}/pkg.yaml"))
            .write_str(&format!("packages:\n  - name: {name}@{version}\n"))
            .expect("write pkg.yaml");
        let mut parts = name.split('/');
        let owner = parts.next().unwrap_or_default();
        let repo = parts.next().unwrap_or_default();
        self.root
            .child(format!("pkgs/{name}/registry.yaml"))
            .write_str(&format!(
                "packages:\n  - type: github_release\n    repo_owner: {owner}\n    repo_name: {repo}\n"
            ))
            .expect("write registry.yaml");
        self
    }

    pub fn latest(&mut self, name: &str, line: &str) -> &mut Self {
        self.toolchain.latest.insert(name.to_owned(), line.to_owned());
        self
    }

    pub fn seed_state(&self, names: &[&str]) {
        let doc = StateDocument::new(names.iter().map(|n| updater_core::Package::new(*n)).collect());
        self.remote
            .insert("latest", doc.to_bytes().expect("serialize state"));
    }

    pub fn pushed_state(&self) -> Option<Vec<String>> {
        let bytes = self.remote.get("latest")?;
        let doc = StateDocument::from_slice(&bytes).expect("pushed state parses");
        Some(doc.packages.into_iter().map(|p| p.name.to_string()).collect())
    }

    pub fn orchestrator(&self) -> Orchestrator {
        self.build(Box::new(self.remote.clone()), Box::new(self.toolchain.clone()))
    }

    pub fn build(&self, artifacts: Box<dyn ArtifactStore>, toolchain: Box<dyn Toolchain>) -> Orchestrator {
        let repo: RepoRef = "aquaproj/aqua-registry".parse().expect("repo");
        let (config, templates) = prepare(self.root.path(), &repo).expect("prepare");
        let work_dir = self.root.path().join(".state");
        std::fs::create_dir_all(&work_dir).expect("state dir");
        Orchestrator::new(
            self.root.path(),
            config,
            templates,
            StateStore::new(artifacts, work_dir),
            Collaborators {
                toolchain,
                pulls: Box::new(self.pulls.clone()),
                probe: Box::new(self.probe.clone()),
            },
        )
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.root.path().join(relative)).expect("read file")
    }
}
