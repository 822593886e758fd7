//! HTTP adapters for the mappings file, Mastodon, Bluesky and webmention.io.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::histogram;
use reqwest::{Client, Url, header::ACCEPT};
use serde::{Deserialize, de::DeserializeOwned};
use tracing::debug;

use crate::application::sources::{FetchError, SocialMappings, SocialSource};
use crate::domain::engagement::{EngagementCounts, MastodonStatusRef, Mention, MentionKind};

use super::error::InfraError;

pub(crate) const METRIC_FETCH_MS: &str = "marginalia_fetch_ms";

const MENTIONS_PER_PAGE: &str = "200";

/// Where the third-party APIs live.
#[derive(Debug, Clone)]
pub struct SocialEndpoints {
    /// Unset when only webmentions are needed.
    pub mappings_url: Option<Url>,
    pub bluesky_api: Url,
    pub webmention_api: Url,
}

#[derive(Clone, Debug)]
pub struct HttpSocialSource {
    client: Client,
    endpoints: SocialEndpoints,
    timeout: Duration,
}

impl HttpSocialSource {
    pub fn new(
        endpoints: SocialEndpoints,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            endpoints,
            timeout,
        })
    }

    pub fn default_user_agent() -> &'static str {
        concat!("marginalia/", env!("CARGO_PKG_VERSION"))
    }

    fn endpoint(base: &Url, path: &str, query: &[(&str, &str)]) -> Result<Url, FetchError> {
        let mut url = base
            .join(path)
            .map_err(|_| FetchError::invalid_url(format!("{base}{path}")))?;
        if !query.is_empty() {
            url.set_query(None);
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        source: &'static str,
        url: Url,
    ) -> Result<T, FetchError> {
        let started = Instant::now();
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| self.transport_error(err))?;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        histogram!(METRIC_FETCH_MS, "source" => source).record(elapsed_ms);
        debug!(
            target = "marginalia::infra::social",
            source,
            url = %url,
            status = status.as_u16(),
            elapsed_ms,
            "fetch finished"
        );

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        serde_json::from_slice(&bytes).map_err(FetchError::decode)
    }

    fn transport_error(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                after_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else {
            FetchError::http(err)
        }
    }
}

#[derive(Deserialize)]
struct MastodonStatus {
    favourites_count: u64,
    reblogs_count: u64,
    replies_count: u64,
}

#[derive(Deserialize)]
struct BlueskyPosts {
    posts: Vec<BlueskyPostView>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlueskyPostView {
    #[serde(default)]
    like_count: u64,
    #[serde(default)]
    repost_count: u64,
    #[serde(default)]
    reply_count: u64,
}

#[derive(Deserialize)]
struct ResolvedHandle {
    did: String,
}

#[derive(Deserialize)]
struct Jf2Feed {
    #[serde(default)]
    children: Vec<Jf2Entry>,
}

#[derive(Deserialize)]
struct Jf2Entry {
    #[serde(rename = "wm-property")]
    property: String,
    #[serde(default)]
    author: Option<Jf2Author>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    content: Option<Jf2Content>,
    #[serde(default)]
    published: Option<String>,
    #[serde(rename = "wm-received", default)]
    received: Option<String>,
}

#[derive(Deserialize)]
struct Jf2Author {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    photo: Option<String>,
}

#[derive(Deserialize)]
struct Jf2Content {
    #[serde(default)]
    text: Option<String>,
}

impl Jf2Entry {
    fn into_mention(self) -> Option<Mention> {
        let kind = MentionKind::from_property(&self.property)?;
        let author = self.author;
        Some(Mention {
            kind,
            author_name: author.as_ref().and_then(|a| a.name.clone()),
            author_url: author.as_ref().and_then(|a| a.url.clone()),
            author_photo: author.and_then(|a| a.photo),
            url: self.url,
            content: self
                .content
                .and_then(|c| c.text)
                .map(|text| text.trim().to_string())
                .filter(|text| !text.is_empty()),
            published: self.published.or(self.received),
        })
    }
}

#[async_trait]
impl SocialSource for HttpSocialSource {
    async fn mappings(&self) -> Result<SocialMappings, FetchError> {
        let url = self
            .endpoints
            .mappings_url
            .clone()
            .ok_or_else(|| FetchError::invalid_url("<mappings url not configured>"))?;
        self.get_json("mappings", url).await
    }

    async fn mastodon_status(
        &self,
        status: &MastodonStatusRef,
    ) -> Result<EngagementCounts, FetchError> {
        let url = Self::endpoint(&status.instance, &status.api_path(), &[])?;
        let body: MastodonStatus = self.get_json("mastodon", url).await?;
        Ok(EngagementCounts {
            likes: body.favourites_count,
            reposts: body.reblogs_count,
            replies: body.replies_count,
        })
    }

    async fn resolve_handle(&self, handle: &str) -> Result<String, FetchError> {
        let url = Self::endpoint(
            &self.endpoints.bluesky_api,
            "xrpc/com.atproto.identity.resolveHandle",
            &[("handle", handle)],
        )?;
        let body: ResolvedHandle = self.get_json("bluesky", url).await?;
        Ok(body.did)
    }

    async fn bluesky_post(&self, at_uri: &str) -> Result<EngagementCounts, FetchError> {
        let url = Self::endpoint(
            &self.endpoints.bluesky_api,
            "xrpc/app.bsky.feed.getPosts",
            &[("uris", at_uri)],
        )?;
        let body: BlueskyPosts = self.get_json("bluesky", url).await?;
        let post = body
            .posts
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::decode(format!("no post returned for {at_uri}")))?;
        Ok(EngagementCounts {
            likes: post.like_count,
            reposts: post.repost_count,
            replies: post.reply_count,
        })
    }

    async fn mentions(&self, target: &str) -> Result<Vec<Mention>, FetchError> {
        let url = Self::endpoint(
            &self.endpoints.webmention_api,
            "api/mentions.jf2",
            &[("target", target), ("per-page", MENTIONS_PER_PAGE)],
        )?;
        let feed: Jf2Feed = self.get_json("webmention", url).await?;
        Ok(feed
            .children
            .into_iter()
            .filter_map(Jf2Entry::into_mention)
            .collect())
    }
}
