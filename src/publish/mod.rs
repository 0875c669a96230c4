//! Release publishing

pub mod github;

use async_trait::async_trait;
pub use github::{GithubConfig, GithubPublisher};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Error types for publishing
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("environment variable {0} is not set; cannot authenticate")]
    MissingToken(String),

    #[error("ref '{0}' is not a tag; releases are keyed by tag")]
    NotATag(String),

    #[error("no repository known for the release")]
    MissingRepository,

    #[error("nothing to publish")]
    NoFiles,

    #[error("release file missing: {}", .0.display())]
    FileMissing(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// What to publish, and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRequest {
    /// `owner/name`
    pub repository: String,

    /// Tag the release is keyed by
    pub tag: String,

    /// Files to attach; each is uploaded exactly once
    pub files: Vec<PathBuf>,

    /// Environment variable holding the API token
    pub token_env: String,
}

/// Result of a successful publish
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    /// Public URL of the release page, when known
    pub release_url: Option<String>,

    /// Names of the uploaded assets, in upload order
    pub uploaded: Vec<String>,

    /// Assets that replaced an existing asset of the same name
    pub replaced: Vec<String>,
}

/// Trait for release publishing - allows for different implementations
#[async_trait]
pub trait ReleasePublisher: Send + Sync {
    /// Create or update the release for `request.tag` and attach the files
    async fn publish(&self, request: &ReleaseRequest) -> Result<PublishReceipt, PublishError>;
}
