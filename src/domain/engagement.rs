use serde::{Deserialize, Serialize};
use url::Url;

/// Like/repost/reply totals for one social post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounts {
    pub likes: u64,
    pub reposts: u64,
    pub replies: u64,
}

impl EngagementCounts {
    pub fn total(&self) -> u64 {
        self.likes
            .saturating_add(self.reposts)
            .saturating_add(self.replies)
    }
}

impl std::ops::Add for EngagementCounts {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            likes: self.likes.saturating_add(rhs.likes),
            reposts: self.reposts.saturating_add(rhs.reposts),
            replies: self.replies.saturating_add(rhs.replies),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Mastodon,
    Bluesky,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformEngagement {
    pub platform: Platform,
    pub url: String,
    pub counts: EngagementCounts,
}

/// Combined engagement for a blog post. A platform that failed or has no
/// linked post is `None` and contributes nothing to the total.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngagementSummary {
    pub mastodon: Option<PlatformEngagement>,
    pub bluesky: Option<PlatformEngagement>,
}

impl EngagementSummary {
    pub fn combined(&self) -> EngagementCounts {
        [&self.mastodon, &self.bluesky]
            .into_iter()
            .flatten()
            .fold(EngagementCounts::default(), |acc, entry| acc + entry.counts)
    }

    pub fn is_empty(&self) -> bool {
        self.mastodon.is_none() && self.bluesky.is_none()
    }
}

/// Social posts announcing a blog post, as listed in the mappings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialLinks {
    #[serde(default)]
    pub mastodon: Option<String>,
    #[serde(default)]
    pub bluesky: Option<String>,
}

/// A Mastodon status addressed by its instance and id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MastodonStatusRef {
    pub instance: Url,
    pub id: String,
}

impl MastodonStatusRef {
    /// Accepts `https://instance/@user/<id>` and `https://instance/users/user/statuses/<id>`.
    pub fn parse(status_url: &str) -> Option<Self> {
        let url = Url::parse(status_url).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let id = url
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .next_back()?
            .to_string();
        if !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }

        let mut instance = url;
        instance.set_path("/");
        instance.set_query(None);
        instance.set_fragment(None);
        Some(Self { instance, id })
    }

    pub fn api_path(&self) -> String {
        format!("api/v1/statuses/{}", self.id)
    }
}

/// Whether a Bluesky actor is already a DID rather than a handle.
pub fn is_did(actor: &str) -> bool {
    actor.starts_with("did:")
}

/// A Bluesky post addressed by author (handle or DID) and record key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlueskyPostRef {
    pub actor: String,
    pub rkey: String,
}

impl BlueskyPostRef {
    /// Accepts `https://bsky.app/profile/<actor>/post/<rkey>`.
    pub fn parse(post_url: &str) -> Option<Self> {
        let url = Url::parse(post_url).ok()?;
        let segments: Vec<&str> = url
            .path_segments()?
            .filter(|segment| !segment.is_empty())
            .collect();
        match segments.as_slice() {
            ["profile", actor, "post", rkey] => Some(Self {
                actor: (*actor).to_string(),
                rkey: (*rkey).to_string(),
            }),
            _ => None,
        }
    }

    pub fn at_uri(&self, did: &str) -> String {
        format!("at://{did}/app.bsky.feed.post/{}", self.rkey)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionKind {
    Like,
    Repost,
    Reply,
    Mention,
    Bookmark,
}

impl MentionKind {
    /// Map a webmention `wm-property` to a kind.
    pub fn from_property(property: &str) -> Option<Self> {
        match property {
            "like-of" => Some(Self::Like),
            "repost-of" => Some(Self::Repost),
            "in-reply-to" => Some(Self::Reply),
            "mention-of" => Some(Self::Mention),
            "bookmark-of" => Some(Self::Bookmark),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mention {
    pub kind: MentionKind,
    pub author_name: Option<String>,
    pub author_url: Option<String>,
    pub author_photo: Option<String>,
    pub url: Option<String>,
    pub content: Option<String>,
    pub published: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MentionSummary {
    pub likes: Vec<Mention>,
    pub reposts: Vec<Mention>,
    pub replies: Vec<Mention>,
    pub mentions: Vec<Mention>,
}

impl MentionSummary {
    /// Bucket mentions by kind; bookmarks are not displayed.
    pub fn from_mentions(mentions: Vec<Mention>) -> Self {
        let mut summary = Self::default();
        for mention in mentions {
            match mention.kind {
                MentionKind::Like => summary.likes.push(mention),
                MentionKind::Repost => summary.reposts.push(mention),
                MentionKind::Reply => summary.replies.push(mention),
                MentionKind::Mention => summary.mentions.push(mention),
                MentionKind::Bookmark => {}
            }
        }
        summary
    }

    pub fn len(&self) -> usize {
        self.likes.len() + self.reposts.len() + self.replies.len() + self.mentions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
