//! Social engagement for a blog post.
//!
//! Looks a post up in the mappings file, then fetches Mastodon and Bluesky
//! counts side by side. Each platform is isolated: a failure is logged,
//! counted and reported as `None` while the other platform still renders.

use std::{sync::Arc, time::Duration};

use metrics::counter;
use tracing::{debug, warn};
use url::Url;

use super::sources::{FetchError, SocialMappings, SocialSource, with_timeout};
use crate::cache::{CacheConfig, CacheScopes, Clock, SystemClock, TtlCache};
use crate::domain::engagement::{
    BlueskyPostRef, EngagementSummary, MastodonStatusRef, MentionSummary, Platform,
    PlatformEngagement, SocialLinks, is_did,
};

pub(crate) const METRIC_FETCH_ERROR: &str = "marginalia_fetch_error_total";

const RESPONSES_NAMESPACE: &str = "engagement";
const IDENTITY_NAMESPACE: &str = "bsky-did";
const MAPPINGS_KEY: &str = "mappings";

#[derive(Clone)]
pub struct EngagementService {
    source: Arc<dyn SocialSource>,
    responses: TtlCache,
    identities: TtlCache,
    config: CacheConfig,
    fetch_timeout: Duration,
}

impl EngagementService {
    pub fn new(
        source: Arc<dyn SocialSource>,
        scopes: &CacheScopes,
        config: &CacheConfig,
        fetch_timeout: Duration,
    ) -> Self {
        Self::with_clock(source, scopes, config, fetch_timeout, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn SocialSource>,
        scopes: &CacheScopes,
        config: &CacheConfig,
        fetch_timeout: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            responses: TtlCache::with_clock(
                Arc::clone(&scopes.session),
                Arc::clone(&clock),
                RESPONSES_NAMESPACE,
            ),
            identities: TtlCache::with_clock(
                Arc::clone(&scopes.persistent),
                clock,
                IDENTITY_NAMESPACE,
            ),
            config: config.clone(),
            fetch_timeout,
        }
    }

    /// Social posts announcing `post_url`. Unknown posts get empty links.
    pub async fn links_for(&self, post_url: &str) -> Result<SocialLinks, FetchError> {
        let mappings: SocialMappings = self
            .responses
            .get_or_fetch(MAPPINGS_KEY, self.config.counts_ttl(), || {
                with_timeout(self.fetch_timeout, self.source.mappings())
            })
            .await
            .inspect_err(|err| record_failure("mappings", post_url, err))?;

        Ok(lookup(&mappings, post_url).cloned().unwrap_or_default())
    }

    /// Combined counts for `post_url`.
    ///
    /// Never fails: unreadable mappings yield an empty summary and a failing
    /// platform is left empty.
    pub async fn summary(&self, post_url: &str) -> EngagementSummary {
        let Ok(links) = self.links_for(post_url).await else {
            return EngagementSummary::default();
        };

        let (mastodon, bluesky) = tokio::join!(
            self.mastodon(links.mastodon.as_deref()),
            self.bluesky(links.bluesky.as_deref()),
        );

        let summary = EngagementSummary {
            mastodon: isolate(Platform::Mastodon, mastodon),
            bluesky: isolate(Platform::Bluesky, bluesky),
        };

        debug!(
            target = "marginalia::engagement",
            post = post_url,
            mastodon = summary.mastodon.is_some(),
            bluesky = summary.bluesky.is_some(),
            total = summary.combined().total(),
            "engagement summary ready"
        );

        summary
    }

    /// Webmentions for `target`, bucketed by kind. Empty when the endpoint
    /// cannot be reached.
    pub async fn mentions(&self, target: &str) -> MentionSummary {
        let key = format!("mentions:{target}");
        let fetched = self
            .responses
            .get_or_fetch(&key, self.config.mentions_ttl(), || {
                with_timeout(self.fetch_timeout, self.source.mentions(target))
            })
            .await;

        match fetched {
            Ok(mentions) => MentionSummary::from_mentions(mentions),
            Err(err) => {
                record_failure("webmention", target, &err);
                MentionSummary::default()
            }
        }
    }

    /// DID for a Bluesky actor; handles are resolved once per identity TTL.
    pub async fn resolve_did(&self, actor: &str) -> Result<String, FetchError> {
        if is_did(actor) {
            return Ok(actor.to_string());
        }

        self.identities
            .get_or_fetch(actor, self.config.identity_ttl(), || {
                with_timeout(self.fetch_timeout, self.source.resolve_handle(actor))
            })
            .await
    }

    async fn mastodon(
        &self,
        status_url: Option<&str>,
    ) -> Result<Option<PlatformEngagement>, FetchError> {
        let Some(status_url) = status_url else {
            return Ok(None);
        };
        let status = MastodonStatusRef::parse(status_url)
            .ok_or_else(|| FetchError::invalid_url(status_url))?;

        let key = format!("mastodon:{}{}", status.instance, status.id);
        let counts = self
            .responses
            .get_or_fetch(&key, self.config.counts_ttl(), || {
                with_timeout(self.fetch_timeout, self.source.mastodon_status(&status))
            })
            .await?;

        Ok(Some(PlatformEngagement {
            platform: Platform::Mastodon,
            url: status_url.to_string(),
            counts,
        }))
    }

    async fn bluesky(
        &self,
        post_url: Option<&str>,
    ) -> Result<Option<PlatformEngagement>, FetchError> {
        let Some(post_url) = post_url else {
            return Ok(None);
        };
        let post =
            BlueskyPostRef::parse(post_url).ok_or_else(|| FetchError::invalid_url(post_url))?;

        let did = self.resolve_did(&post.actor).await?;
        let at_uri = post.at_uri(&did);
        let key = format!("bluesky:{at_uri}");
        let counts = self
            .responses
            .get_or_fetch(&key, self.config.counts_ttl(), || {
                with_timeout(self.fetch_timeout, self.source.bluesky_post(&at_uri))
            })
            .await?;

        Ok(Some(PlatformEngagement {
            platform: Platform::Bluesky,
            url: post_url.to_string(),
            counts,
        }))
    }
}

fn isolate(
    platform: Platform,
    result: Result<Option<PlatformEngagement>, FetchError>,
) -> Option<PlatformEngagement> {
    match result {
        Ok(entry) => entry,
        Err(err) => {
            let source = match platform {
                Platform::Mastodon => "mastodon",
                Platform::Bluesky => "bluesky",
            };
            record_failure(source, "", &err);
            None
        }
    }
}

fn record_failure(source: &'static str, subject: &str, err: &FetchError) {
    counter!(METRIC_FETCH_ERROR, "source" => source, "kind" => err.kind()).increment(1);
    warn!(
        target = "marginalia::engagement",
        source,
        subject,
        error = %err,
        "fetch failed"
    );
}

/// Find the mapping for `post_url`, trying the exact key first and then its
/// path with and without a trailing slash.
fn lookup<'a>(mappings: &'a SocialMappings, post_url: &str) -> Option<&'a SocialLinks> {
    if let Some(links) = mappings.get(post_url) {
        return Some(links);
    }

    let path = Url::parse(post_url)
        .map(|url| url.path().to_string())
        .unwrap_or_else(|_| post_url.to_string());
    let bare = path.trim_end_matches('/');
    let candidates = [path.clone(), format!("{bare}/"), bare.to_string()];
    candidates.iter().find_map(|key| mappings.get(key))
}
