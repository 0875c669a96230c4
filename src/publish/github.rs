//! GitHub Releases publisher
//!
//! Looks up the release for a tag (creating it when missing), removes any
//! asset that would be replaced, and uploads each file.

use crate::publish::{PublishError, PublishReceipt, ReleasePublisher, ReleaseRequest};
use async_trait::async_trait;
use reqwest::{header, Client, IntoUrl, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

const API_VERSION: &str = "2022-11-28";

/// Environment variable GitHub runners set to the REST API root
pub const API_URL_ENV: &str = "GITHUB_API_URL";

/// Configuration for the GitHub publisher
#[derive(Debug, Clone)]
pub struct GithubConfig {
    /// REST API root
    pub api_base: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.github.com".to_string(),
            timeout_secs: 300,
        }
    }
}

impl GithubConfig {
    /// Defaults, with the API root taken from `GITHUB_API_URL` when set
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            Some(api_base) => Self::default().with_api_base(api_base),
            None => Self::default(),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct Release {
    id: u64,
    #[serde(default)]
    html_url: Option<String>,
    upload_url: String,
    #[serde(default)]
    assets: Vec<Asset>,
}

#[derive(Debug, Deserialize)]
struct Asset {
    id: u64,
    name: String,
}

/// Strip the RFC 6570 suffix from an `upload_url` (`...assets{?name,label}`)
pub fn upload_endpoint(upload_url: &str) -> &str {
    upload_url.split('{').next().unwrap_or(upload_url)
}

/// `repos/<owner>/<name>` as path segments
fn repo_path(repository: &str) -> impl Iterator<Item = &str> {
    std::iter::once("repos").chain(repository.split('/').filter(|s| !s.is_empty()))
}

/// Publishes to GitHub Releases over the REST API
pub struct GithubPublisher {
    client: Client,
    config: GithubConfig,
}

impl std::fmt::Debug for GithubPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GithubPublisher")
            .field("api_base", &self.config.api_base)
            .field("timeout_secs", &self.config.timeout_secs)
            .finish()
    }
}

impl GithubPublisher {
    /// Create a new publisher with the given configuration
    pub fn new(config: GithubConfig) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("release-pipeline/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PublishError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    fn request(&self, method: Method, url: impl IntoUrl, token: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(token)
            .header(header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    /// API root joined with percent-encoded path segments
    fn api_url<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Result<Url, PublishError> {
        let base = &self.config.api_base;
        let mut url = Url::parse(base)
            .map_err(|e| PublishError::Config(format!("Invalid API root '{}': {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| PublishError::Config(format!("API root '{}' cannot hold a path", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn find_or_create_release(
        &self,
        repository: &str,
        tag: &str,
        token: &str,
    ) -> Result<Release, PublishError> {
        let url = self.api_url(repo_path(repository).chain(["releases", "tags", tag]))?;
        let response = self.request(Method::GET, url, token).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            info!("No release for tag {} yet, creating it", tag);
            let url = self.api_url(repo_path(repository).chain(["releases"]))?;
            let body = serde_json::json!({ "tag_name": tag, "name": tag });
            let response = self
                .request(Method::POST, url, token)
                .json(&body)
                .send()
                .await?;
            return Ok(check(response).await?.json::<Release>().await?);
        }

        Ok(check(response).await?.json::<Release>().await?)
    }

    async fn delete_asset(&self, repository: &str, asset: &Asset, token: &str) -> Result<(), PublishError> {
        let id = asset.id.to_string();
        let url = self.api_url(repo_path(repository).chain(["releases", "assets", id.as_str()]))?;
        let response = self.request(Method::DELETE, url, token).send().await?;
        check(response).await?;
        Ok(())
    }

    async fn upload_asset(
        &self,
        release: &Release,
        path: &Path,
        name: &str,
        token: &str,
    ) -> Result<(), PublishError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| PublishError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Uploading {} ({} bytes) to release {}", name, bytes.len(), release.id);

        let response = self
            .request(Method::POST, upload_endpoint(&release.upload_url), token)
            .query(&[("name", name)])
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

/// Turn non-success responses into `PublishError::Api`
async fn check(response: Response) -> Result<Response, PublishError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&text)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or(text);
    warn!("GitHub API returned {}: {}", status, message);

    Err(PublishError::Api {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl ReleasePublisher for GithubPublisher {
    async fn publish(&self, request: &ReleaseRequest) -> Result<PublishReceipt, PublishError> {
        let token = std::env::var(&request.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| PublishError::MissingToken(request.token_env.clone()))?;

        if request.files.is_empty() {
            return Err(PublishError::NoFiles);
        }

        let release = self
            .find_or_create_release(&request.repository, &request.tag, &token)
            .await?;

        let mut receipt = PublishReceipt {
            release_url: release.html_url.clone(),
            ..Default::default()
        };

        for path in &request.files {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| PublishError::FileMissing(path.clone()))?;

            if let Some(existing) = release.assets.iter().find(|a| a.name == name) {
                info!("Replacing existing asset {}", name);
                self.delete_asset(&request.repository, existing, &token).await?;
                receipt.replaced.push(name.clone());
            }

            self.upload_asset(&release, path, &name, &token).await?;
            info!("Uploaded {} to {} {}", name, request.repository, request.tag);
            receipt.uploaded.push(name);
        }

        Ok(receipt)
    }
}
