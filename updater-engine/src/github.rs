//! GitHub HTTP adapters: the pull request REST client and the repository
//! redirect probe.
//!
//! Both use `ureq` and run on the tokio blocking pool.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use updater_core::{RepoCoordinates, RepoRef};

use crate::collaborators::{NewPullRequest, PullRequestService, RepositoryProbe};
use crate::error::ToolError;

pub const GITHUB_API: &str = "https://api.github.com";
pub const GITHUB_WEB: &str = "https://github.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("aqua-registry-updater/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// Pull requests
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CreatePullRequest<'a> {
    title: &'a str,
    body: &'a str,
    head: &'a str,
    base: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreatedPullRequest {
    number: u64,
}

/// `POST /repos/{owner}/{repo}/pulls` with a token.
#[derive(Clone)]
pub struct GitHubPulls {
    agent: ureq::Agent,
    api_base: String,
    repo: RepoRef,
    token: String,
}

impl GitHubPulls {
    pub fn new(repo: RepoRef, token: impl Into<String>) -> Self {
        Self::with_api_base(GITHUB_API, repo, token)
    }

    pub fn with_api_base(api_base: &str, repo: RepoRef, token: impl Into<String>) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(REQUEST_TIMEOUT)
                .user_agent(USER_AGENT)
                .build(),
            api_base: api_base.trim_end_matches('/').to_owned(),
            repo,
            token: token.into(),
        }
    }

    fn pulls_url(&self) -> String {
        format!("{}/repos/{}/{}/pulls", self.api_base, self.repo.owner, self.repo.name)
    }

    fn create_blocking(&self, pr: &NewPullRequest) -> Result<u64, ToolError> {
        let url = self.pulls_url();
        let response = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.token))
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", "2022-11-28")
            .send_json(CreatePullRequest {
                title: &pr.title,
                body: &pr.body,
                head: &pr.head,
                base: &pr.base,
            })
            .map_err(|err| http_error(&url, err))?;
        let created: CreatedPullRequest = response.into_json().map_err(|e| ToolError::Http {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok(created.number)
    }
}

#[async_trait]
impl PullRequestService for GitHubPulls {
    async fn create_pull_request(&self, pr: &NewPullRequest) -> Result<u64, ToolError> {
        let this = self.clone();
        let pr = pr.clone();
        tokio::task::spawn_blocking(move || this.create_blocking(&pr))
            .await
            .map_err(|e| ToolError::Background(e.to_string()))?
    }
}

// ---------------------------------------------------------------------------
// Redirect probe
// ---------------------------------------------------------------------------

/// `GET https://github.com/<owner>/<repo>` without following redirects.
#[derive(Clone)]
pub struct HttpRepositoryProbe {
    agent: ureq::Agent,
    web_base: String,
}

impl HttpRepositoryProbe {
    pub fn new() -> Self {
        Self::with_web_base(GITHUB_WEB)
    }

    pub fn with_web_base(web_base: &str) -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .redirects(0)
                .timeout(REQUEST_TIMEOUT)
                .user_agent(USER_AGENT)
                .build(),
            web_base: web_base.trim_end_matches('/').to_owned(),
        }
    }

    fn probe_blocking(&self, repo: &RepoCoordinates) -> Result<Option<String>, ToolError> {
        let url = format!("{}/{}/{}", self.web_base, repo.owner, repo.repo);
        let response = self.agent.get(&url).call().map_err(|err| http_error(&url, err))?;
        if (300..400).contains(&response.status()) {
            return Ok(response.header("Location").map(str::to_owned));
        }
        Ok(None)
    }
}

impl Default for HttpRepositoryProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RepositoryProbe for HttpRepositoryProbe {
    async fn redirect_location(&self, repo: &RepoCoordinates) -> Result<Option<String>, ToolError> {
        let this = self.clone();
        let repo = repo.clone();
        tokio::task::spawn_blocking(move || this.probe_blocking(&repo))
            .await
            .map_err(|e| ToolError::Background(e.to_string()))?
    }
}

/// `owner/repo` named by a GitHub web URL (absolute or root-relative).
pub fn parse_github_location(location: &str) -> Option<RepoCoordinates> {
    let url = match Url::parse(location) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) if location.starts_with('/') => {
            Url::parse(GITHUB_WEB).ok()?.join(location).ok()?
        }
        Err(_) => return None,
    };
    let host = url.host_str()?.to_ascii_lowercase();
    if host != "github.com" && host != "www.github.com" {
        return None;
    }
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?;
    let repo = segments.next()?.trim_end_matches(".git");
    if repo.is_empty() {
        return None;
    }
    Some(RepoCoordinates {
        owner: owner.to_owned(),
        repo: repo.to_owned(),
    })
}

fn http_error(url: &str, err: ureq::Error) -> ToolError {
    match err {
        ureq::Error::Status(status, response) => ToolError::Response {
            url: url.to_owned(),
            status,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => ToolError::Http {
            url: url.to_owned(),
            message: transport.to_string(),
        },
    }
}
