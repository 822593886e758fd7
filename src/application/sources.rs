use std::{collections::HashMap, future::Future, time::Duration};

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::engagement::{EngagementCounts, MastodonStatusRef, Mention, SocialLinks};

/// Blog post key (URL or path) to the social posts that announced it.
pub type SocialMappings = HashMap<String, SocialLinks>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("request failed: {message}")]
    Http { message: String },
    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("unexpected response shape: {message}")]
    Decode { message: String },
    #[error("invalid url `{url}`")]
    InvalidUrl { url: String },
}

impl FetchError {
    pub fn http(err: impl std::fmt::Display) -> Self {
        Self::Http {
            message: err.to_string(),
        }
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode {
            message: err.to_string(),
        }
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Http { .. } => "http",
            FetchError::Status { .. } => "status",
            FetchError::Timeout { .. } => "timeout",
            FetchError::Decode { .. } => "decode",
            FetchError::InvalidUrl { .. } => "invalid_url",
        }
    }
}

/// Bound `fut` by `limit`; an elapsed deadline becomes [`FetchError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| FetchError::Timeout {
            after_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
        })?
}

/// Third-party endpoints the engagement widgets read from.
#[async_trait]
pub trait SocialSource: Send + Sync {
    async fn mappings(&self) -> Result<SocialMappings, FetchError>;

    async fn mastodon_status(
        &self,
        status: &MastodonStatusRef,
    ) -> Result<EngagementCounts, FetchError>;

    /// Resolve a Bluesky handle to its DID.
    async fn resolve_handle(&self, handle: &str) -> Result<String, FetchError>;

    async fn bluesky_post(&self, at_uri: &str) -> Result<EngagementCounts, FetchError>;

    /// Webmentions received by `target`.
    async fn mentions(&self, target: &str) -> Result<Vec<Mention>, FetchError>;
}
