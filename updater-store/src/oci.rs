//! OCI distribution API client for the single-file state artifact.
//!
//! # Wire format
//!
//! The artifact is an OCI image manifest (v1.1 artifact form):
//!
//! | Part     | Media type                              | Content          |
//! |----------|-----------------------------------------|------------------|
//! | manifest | `application/vnd.oci.image.manifest.v1+json`, artifactType `example/files` | |
//! | config   | `application/vnd.oci.empty.v1+json`     | `{}`             |
//! | layer    | `example/file`, title `data.json`       | state document   |
//!
//! These are the media types existing deployments already published, so a
//! registry populated by them keeps working.
//!
//! # Auth
//!
//! `GET /v2/` is probed first. A `Bearer` challenge is answered by exchanging
//! the basic credentials at the challenge realm for a token scoped to
//! `repository:<repo>:pull,push`; a `Basic` challenge gets the credentials
//! directly.
//!
//! `ureq` is blocking, so every operation runs on the tokio blocking pool.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::Read;
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;
use url::Url;

use crate::artifact::ArtifactStore;
use crate::error::StoreError;
use crate::state::STATE_FILE;

pub const MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";
pub const EMPTY_MEDIA_TYPE: &str = "application/vnd.oci.empty.v1+json";
pub const ARTIFACT_TYPE: &str = "example/files";
pub const LAYER_MEDIA_TYPE: &str = "example/file";
pub const TITLE_ANNOTATION: &str = "org.opencontainers.image.title";
pub const CREATED_ANNOTATION: &str = "org.opencontainers.image.created";

const EMPTY_CONFIG: &[u8] = b"{}";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Static registry credentials: a user name and a token used as password.
#[derive(Clone)]
pub struct RegistryCredentials {
    pub username: String,
    pub password: String,
}

impl RegistryCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Basic <base64(user:password)>`
    pub fn basic_header(&self) -> String {
        format!(
            "Basic {}",
            STANDARD.encode(format!("{}:{}", self.username, self.password))
        )
    }
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Manifest model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub media_type: String,
    pub digest: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Descriptor {
    /// Descriptor of `content` under `media_type`.
    pub fn of(media_type: &str, content: &[u8]) -> Self {
        Self {
            media_type: media_type.to_owned(),
            digest: sha256_digest(content),
            size: content.len() as u64,
            annotations: BTreeMap::new(),
        }
    }

    pub fn titled(mut self, title: &str) -> Self {
        self.annotations
            .insert(TITLE_ANNOTATION.to_owned(), title.to_owned());
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.annotations.get(TITLE_ANNOTATION).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub schema_version: u32,
    #[serde(default)]
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact_type: Option<String>,
    pub config: Descriptor,
    #[serde(default)]
    pub layers: Vec<Descriptor>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl Manifest {
    /// Artifact manifest with an empty config blob and the given layers.
    pub fn artifact(layers: Vec<Descriptor>, created: String) -> Self {
        Self {
            schema_version: 2,
            media_type: MANIFEST_MEDIA_TYPE.to_owned(),
            artifact_type: Some(ARTIFACT_TYPE.to_owned()),
            config: Descriptor::of(EMPTY_MEDIA_TYPE, EMPTY_CONFIG),
            layers,
            annotations: BTreeMap::from([(CREATED_ANNOTATION.to_owned(), created)]),
        }
    }

    /// The layer carrying `file`, matched by title annotation.
    pub fn layer_titled(&self, file: &str) -> Option<&Descriptor> {
        self.layers.iter().find(|l| l.title() == Some(file))
    }
}

/// `sha256:<hex>`
pub fn sha256_digest(content: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(content)))
}

// ---------------------------------------------------------------------------
// Auth challenge
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Challenge {
    Bearer { realm: String, service: Option<String> },
    Basic,
}

impl Challenge {
    /// Parse a `WWW-Authenticate` header value.
    pub fn parse(header: &str) -> Option<Self> {
        let header = header.trim();
        let (scheme, params) = header.split_once(' ').unwrap_or((header, ""));
        if scheme.eq_ignore_ascii_case("basic") {
            return Some(Challenge::Basic);
        }
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let mut params = parse_auth_params(params);
        Some(Challenge::Bearer {
            realm: params.remove("realm")?,
            service: params.remove("service"),
        })
    }
}

/// `k1="v1",k2=v2` → map. Keys are lowercased; quoted values may contain commas.
fn parse_auth_params(input: &str) -> HashMap<String, String> {
    let mut params = HashMap::new();
    let mut rest = input.trim();
    while !rest.is_empty() {
        let Some((key, after)) = rest.split_once('=') else { break };
        let key = key.trim().to_ascii_lowercase();
        let (value, remaining) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            },
            None => match after.find(',') {
                Some(end) => (&after[..end], &after[end..]),
                None => (after, ""),
            },
        };
        params.insert(key, value.trim().to_owned());
        rest = remaining.trim_start_matches([',', ' ']);
    }
    params
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: String,
    #[serde(default)]
    access_token: String,
}

// ---------------------------------------------------------------------------
// OciRegistry
// ---------------------------------------------------------------------------

/// [`ArtifactStore`] backed by an OCI distribution registry.
#[derive(Clone)]
pub struct OciRegistry {
    agent: ureq::Agent,
    base: String,
    repository: String,
    credentials: RegistryCredentials,
}

impl fmt::Debug for OciRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OciRegistry")
            .field("base", &self.base)
            .field("repository", &self.repository)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl OciRegistry {
    /// `registry` is a host (`ghcr.io`) or a full base URL
    /// (`http://localhost:5000`); `repository` is `owner/name`.
    pub fn new(registry: &str, repository: &str, credentials: RegistryCredentials) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("aqua-registry-updater/", env!("CARGO_PKG_VERSION")))
            .build();
        Self {
            agent,
            base: registry_base_url(registry),
            repository: repository.trim_matches('/').to_owned(),
            credentials,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/{}/{path}", self.base, self.repository)
    }

    fn reference(&self, tag: &str) -> String {
        format!("{}/{}:{tag}", self.base, self.repository)
    }

    /// Send a request; non-2xx statuses become [`StoreError::Status`].
    fn send(
        &self,
        method: &'static str,
        url: &str,
        auth: Option<&str>,
        headers: &[(&str, &str)],
        body: Option<&[u8]>,
    ) -> Result<ureq::Response, StoreError> {
        let mut request = self.agent.request(method, url);
        if let Some(auth) = auth {
            request = request.set("Authorization", auth);
        }
        for (name, value) in headers {
            request = request.set(name, value);
        }
        let result = match body {
            Some(body) => request.send_bytes(body),
            None => request.call(),
        };
        result.map_err(|err| http_error(method, url, err))
    }

    // -- auth ---------------------------------------------------------------

    /// `Authorization` header value for this repository, if the registry
    /// asks for one.
    fn authorize(&self) -> Result<Option<String>, StoreError> {
        let url = format!("{}/v2/", self.base);
        let challenge = match self.agent.get(&url).call() {
            Ok(_) => return Ok(None),
            Err(ureq::Error::Status(401, response)) => response
                .header("WWW-Authenticate")
                .unwrap_or_default()
                .to_owned(),
            Err(err) => return Err(http_error("GET", &url, err)),
        };
        match Challenge::parse(&challenge) {
            Some(Challenge::Basic) => Ok(Some(self.credentials.basic_header())),
            Some(Challenge::Bearer { realm, service }) => {
                self.fetch_token(&realm, service.as_deref()).map(Some)
            }
            None => Err(StoreError::Auth(format!(
                "unsupported WWW-Authenticate challenge '{challenge}'"
            ))),
        }
    }

    fn fetch_token(&self, realm: &str, service: Option<&str>) -> Result<String, StoreError> {
        let scope = format!("repository:{}:pull,push", self.repository);
        let mut request = self.agent.get(realm).query("scope", &scope);
        if let Some(service) = service {
            request = request.query("service", service);
        }
        if !self.credentials.username.is_empty() {
            request = request.set("Authorization", &self.credentials.basic_header());
        }
        let response = request.call().map_err(|err| match err {
            ureq::Error::Status(status, _) => {
                StoreError::Auth(format!("token endpoint {realm} returned HTTP {status}"))
            }
            other => http_error("GET", realm, other),
        })?;
        let body: TokenResponse = response.into_json().map_err(|e| StoreError::Transport {
            url: realm.to_owned(),
            message: e.to_string(),
        })?;
        let token = if body.token.is_empty() {
            body.access_token
        } else {
            body.token
        };
        if token.is_empty() {
            return Err(StoreError::Auth(format!("token endpoint {realm} returned no token")));
        }
        Ok(format!("Bearer {token}"))
    }

    // -- pull ---------------------------------------------------------------

    fn pull_blocking(&self, tag: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let auth = self.authorize()?;
        let url = self.url(&format!("manifests/{tag}"));
        let response = match self.send(
            "GET",
            &url,
            auth.as_deref(),
            &[("Accept", MANIFEST_MEDIA_TYPE)],
            None,
        ) {
            Ok(response) => response,
            Err(StoreError::Status { status: 404, .. }) => return Ok(None),
            Err(err) => return Err(err),
        };
        let manifest: Manifest = serde_json::from_slice(&read_body(response, &url)?)?;
        let layer = manifest
            .layer_titled(STATE_FILE)
            .ok_or_else(|| StoreError::MissingLayer {
                reference: self.reference(tag),
                file: STATE_FILE.to_owned(),
            })?;

        let blob_url = self.url(&format!("blobs/{}", layer.digest));
        let blob = read_body(self.send("GET", &blob_url, auth.as_deref(), &[], None)?, &blob_url)?;
        let actual = sha256_digest(&blob);
        if actual != layer.digest {
            return Err(StoreError::Digest {
                expected: layer.digest.clone(),
                actual,
            });
        }
        debug!(reference = %self.reference(tag), size = blob.len(), "pulled state artifact");
        Ok(Some(blob))
    }

    // -- push ---------------------------------------------------------------

    fn push_blocking(&self, tag: &str, data: &[u8]) -> Result<(), StoreError> {
        let auth = self.authorize()?;
        let layer = Descriptor::of(LAYER_MEDIA_TYPE, data).titled(STATE_FILE);
        let manifest = Manifest::artifact(
            vec![layer.clone()],
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        );

        // Blobs first: the tag must never point at content that is not there.
        self.upload_blob(&manifest.config.digest, EMPTY_CONFIG, auth.as_deref())?;
        self.upload_blob(&layer.digest, data, auth.as_deref())?;

        let url = self.url(&format!("manifests/{tag}"));
        let body = serde_json::to_vec(&manifest)?;
        self.send(
            "PUT",
            &url,
            auth.as_deref(),
            &[("Content-Type", MANIFEST_MEDIA_TYPE)],
            Some(body.as_slice()),
        )?;
        debug!(reference = %self.reference(tag), digest = %layer.digest, "pushed state artifact");
        Ok(())
    }

    fn upload_blob(&self, digest: &str, content: &[u8], auth: Option<&str>) -> Result<(), StoreError> {
        let head_url = self.url(&format!("blobs/{digest}"));
        match self.send("HEAD", &head_url, auth, &[], None) {
            Ok(_) => return Ok(()),
            Err(StoreError::Status { status: 404, .. }) => {}
            Err(err) => return Err(err),
        }

        let start_url = self.url("blobs/uploads/");
        let started = self.send("POST", &start_url, auth, &[], Some(b"".as_slice()))?;
        let location = started.header("Location").ok_or_else(|| StoreError::Transport {
            url: start_url.clone(),
            message: "upload session without Location header".to_owned(),
        })?;
        let upload_url = upload_url(&start_url, location, digest).map_err(|e| StoreError::Transport {
            url: start_url.clone(),
            message: format!("invalid upload location '{location}': {e}"),
        })?;
        self.send(
            "PUT",
            &upload_url,
            auth,
            &[("Content-Type", "application/octet-stream")],
            Some(content),
        )?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactStore for OciRegistry {
    async fn pull(&self, tag: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let this = self.clone();
        let tag = tag.to_owned();
        tokio::task::spawn_blocking(move || this.pull_blocking(&tag))
            .await
            .map_err(|e| StoreError::Background(e.to_string()))?
    }

    async fn push(&self, tag: &str, data: Vec<u8>) -> Result<(), StoreError> {
        let this = self.clone();
        let tag = tag.to_owned();
        tokio::task::spawn_blocking(move || this.push_blocking(&tag, &data))
            .await
            .map_err(|e| StoreError::Background(e.to_string()))?
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn registry_base_url(registry: &str) -> String {
    let registry = registry.trim_end_matches('/');
    if registry.starts_with("http://") || registry.starts_with("https://") {
        registry.to_owned()
    } else {
        format!("https://{registry}")
    }
}

/// The URL a monolithic upload is `PUT` to. `location` may be absolute,
/// root-relative or relative to the request that returned it.
fn upload_url(request_url: &str, location: &str, digest: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(request_url)?.join(location)?;
    url.query_pairs_mut().append_pair("digest", digest);
    Ok(url.into())
}

fn read_body(response: ureq::Response, url: &str) -> Result<Vec<u8>, StoreError> {
    let mut body = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut body)
        .map_err(|e| StoreError::Transport {
            url: url.to_owned(),
            message: e.to_string(),
        })?;
    Ok(body)
}

fn http_error(method: &'static str, url: &str, err: ureq::Error) -> StoreError {
    match err {
        ureq::Error::Status(status, response) => StoreError::Status {
            method,
            url: url.to_owned(),
            status,
            body: response.into_string().unwrap_or_default(),
        },
        ureq::Error::Transport(transport) => StoreError::Transport {
            url: url.to_owned(),
            message: transport.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
