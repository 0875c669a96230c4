//! Push events and git reference classification

use serde::{Deserialize, Serialize};
use std::fmt;

const TAG_PREFIX: &str = "refs/tags/";
const BRANCH_PREFIX: &str = "refs/heads/";

/// A classified git reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GitRef {
    /// `refs/tags/<name>`
    Tag(String),
    /// `refs/heads/<name>`
    Branch(String),
    /// Anything else, kept verbatim
    Other(String),
}

impl GitRef {
    /// Classify a full reference name
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(name) = raw.strip_prefix(TAG_PREFIX) {
            GitRef::Tag(name.to_string())
        } else if let Some(name) = raw.strip_prefix(BRANCH_PREFIX) {
            GitRef::Branch(name.to_string())
        } else {
            GitRef::Other(raw.to_string())
        }
    }

    /// The full reference, e.g. `refs/tags/v1.0.0`
    pub fn full(&self) -> String {
        match self {
            GitRef::Tag(name) => format!("{}{}", TAG_PREFIX, name),
            GitRef::Branch(name) => format!("{}{}", BRANCH_PREFIX, name),
            GitRef::Other(raw) => raw.clone(),
        }
    }

    /// The short name, e.g. `v1.0.0` or `main`
    pub fn short_name(&self) -> &str {
        match self {
            GitRef::Tag(name) | GitRef::Branch(name) | GitRef::Other(name) => name,
        }
    }

    /// `tag`, `branch` or empty
    pub fn ref_type(&self) -> &'static str {
        match self {
            GitRef::Tag(_) => "tag",
            GitRef::Branch(_) => "branch",
            GitRef::Other(_) => "",
        }
    }

    pub fn is_tag(&self) -> bool {
        matches!(self, GitRef::Tag(_))
    }

    pub fn tag_name(&self) -> Option<&str> {
        match self {
            GitRef::Tag(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for GitRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full())
    }
}

/// The event that triggers a pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Pushed reference
    pub git_ref: GitRef,

    /// Commit the reference points at, when known
    pub sha: Option<String>,

    /// `owner/name` of the repository, when known
    pub repository: Option<String>,
}

impl PushEvent {
    pub fn new(git_ref: &str) -> Self {
        Self {
            git_ref: GitRef::parse(git_ref),
            sha: None,
            repository: None,
        }
    }

    pub fn with_sha(mut self, sha: impl Into<String>) -> Self {
        self.sha = Some(sha.into());
        self
    }

    pub fn with_repository(mut self, repository: impl Into<String>) -> Self {
        self.repository = Some(repository.into());
        self
    }

    /// Build an event from explicit values, falling back to the
    /// `GITHUB_REF`, `GITHUB_SHA` and `GITHUB_REPOSITORY` environment variables.
    ///
    /// Returns `None` when no reference is available from either source.
    pub fn resolve(
        git_ref: Option<&str>,
        sha: Option<&str>,
        repository: Option<&str>,
    ) -> Option<Self> {
        Self::resolve_with(git_ref, sha, repository, |key| std::env::var(key).ok())
    }

    /// Like [`PushEvent::resolve`], reading fallbacks through `lookup`
    pub fn resolve_with(
        git_ref: Option<&str>,
        sha: Option<&str>,
        repository: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Option<Self> {
        let fallback = |explicit: Option<&str>, key: &str| {
            explicit
                .map(str::to_string)
                .or_else(|| lookup(key))
                .filter(|v| !v.trim().is_empty())
        };

        let git_ref = fallback(git_ref, "GITHUB_REF")?;
        Some(Self {
            git_ref: GitRef::parse(&git_ref),
            sha: fallback(sha, "GITHUB_SHA"),
            repository: fallback(repository, "GITHUB_REPOSITORY"),
        })
    }

    /// Revision that checkout should land on
    pub fn checkout_target(&self) -> String {
        if let Some(sha) = &self.sha {
            return sha.clone();
        }
        match &self.git_ref {
            GitRef::Tag(name) => format!("{}{}", TAG_PREFIX, name),
            GitRef::Branch(name) => format!("origin/{}", name),
            GitRef::Other(raw) => raw.clone(),
        }
    }
}
