use std::sync::Arc;
use std::time::Duration;

use httpmock::MockServer;
use marginalia::application::engagement::EngagementService;
use marginalia::cache::{CacheConfig, CacheScopes};
use marginalia::domain::engagement::{EngagementCounts, MentionKind};
use marginalia::infra::social::{HttpSocialSource, SocialEndpoints};
use tempfile::TempDir;
use url::Url;

const DID: &str = "did:plc:alice123";

fn service(server: &MockServer, cache: &CacheConfig) -> EngagementService {
    let base = Url::parse(&server.base_url()).expect("base url");
    let source = HttpSocialSource::new(
        SocialEndpoints {
            mappings_url: Some(base.join("/mappings.json").expect("mappings url")),
            bluesky_api: base.clone(),
            webmention_api: base,
        },
        Duration::from_secs(5),
        HttpSocialSource::default_user_agent(),
    )
    .expect("source");

    EngagementService::new(
        Arc::new(source),
        &CacheScopes::open(cache),
        cache,
        Duration::from_secs(5),
    )
}

fn mock_mappings(server: &MockServer) -> httpmock::Mock<'_> {
    let body = format!(
        r#"{{
            "/spring/": {{
                "mastodon": "{}/@alice/111",
                "bluesky": "https://bsky.app/profile/alice.test/post/3kxyz"
            }},
            "/quiet/": {{}}
        }}"#,
        server.base_url()
    );
    server.mock(|when, then| {
        when.method("GET").path("/mappings.json");
        then.status(200)
            .header("content-type", "application/json")
            .body(body);
    })
}

#[tokio::test]
async fn combines_platform_counts_and_persists_identity() {
    let server = MockServer::start();
    let mappings = mock_mappings(&server);
    let mastodon = server.mock(|when, then| {
        when.method("GET").path("/api/v1/statuses/111");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"favourites_count":4,"reblogs_count":2,"replies_count":1}"#);
    });
    let resolve = server.mock(|when, then| {
        when.method("GET")
            .path("/xrpc/com.atproto.identity.resolveHandle")
            .query_param("handle", "alice.test");
        then.status(200)
            .header("content-type", "application/json")
            .body(format!(r#"{{"did":"{DID}"}}"#));
    });
    let posts = server.mock(|when, then| {
        when.method("GET")
            .path("/xrpc/app.bsky.feed.getPosts")
            .query_param("uris", format!("at://{DID}/app.bsky.feed.post/3kxyz"));
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"posts":[{"likeCount":10,"repostCount":3,"replyCount":0}]}"#);
    });

    let directory = TempDir::new().expect("temp dir");
    let cache = CacheConfig {
        directory: directory.path().to_path_buf(),
        ..CacheConfig::default()
    };

    let first = service(&server, &cache);
    let summary = first.summary("https://blog.example/spring/").await;

    assert_eq!(
        summary.combined(),
        EngagementCounts {
            likes: 14,
            reposts: 5,
            replies: 1,
        }
    );

    // Counts are memoized for the session.
    first.summary("/spring/").await;
    mappings.assert_hits(1);
    mastodon.assert_hits(1);
    posts.assert_hits(1);

    // A fresh process re-fetches counts but reuses the stored identity.
    let second = service(&server, &cache);
    second.summary("/spring/").await;
    mappings.assert_hits(2);
    posts.assert_hits(2);
    resolve.assert_hits(1);
}

#[tokio::test]
async fn one_failing_platform_leaves_the_other_intact() {
    let server = MockServer::start();
    mock_mappings(&server);
    server.mock(|when, then| {
        when.method("GET").path("/api/v1/statuses/111");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"favourites_count":4,"reblogs_count":2,"replies_count":1}"#);
    });
    server.mock(|when, then| {
        when.method("GET").path("/xrpc/com.atproto.identity.resolveHandle");
        then.status(500);
    });

    let directory = TempDir::new().expect("temp dir");
    let cache = CacheConfig {
        directory: directory.path().to_path_buf(),
        ..CacheConfig::default()
    };

    let summary = service(&server, &cache).summary("/spring/").await;

    assert!(summary.bluesky.is_none());
    assert_eq!(summary.mastodon.map(|entry| entry.counts.total()), Some(7));
}

#[tokio::test]
async fn unmapped_posts_render_nothing_without_platform_calls() {
    let server = MockServer::start();
    mock_mappings(&server);
    let any_status = server.mock(|when, then| {
        when.method("GET").path("/api/v1/statuses/111");
        then.status(200).body("{}");
    });

    let directory = TempDir::new().expect("temp dir");
    let cache = CacheConfig {
        directory: directory.path().to_path_buf(),
        ..CacheConfig::default()
    };
    let service = service(&server, &cache);

    let quiet = service.summary("/quiet/").await;
    let unknown = service.summary("/never-announced/").await;

    assert!(quiet.is_empty());
    assert!(unknown.is_empty());
    any_status.assert_hits(0);
}

#[tokio::test]
async fn mentions_are_grouped_by_kind() {
    let server = MockServer::start();
    let mock = server.mock(|when, then| {
        when.method("GET")
            .path("/api/mentions.jf2")
            .query_param("target", "https://blog.example/spring/");
        then.status(200)
            .header("content-type", "application/json")
            .body(
                r#"{"type":"feed","children":[
                    {"wm-property":"like-of","author":{"name":"Bo"}},
                    {"wm-property":"like-of","author":{"name":"Cy"}},
                    {"wm-property":"in-reply-to","author":{"name":"Di"},"content":{"text":"  Lovely  "}},
                    {"wm-property":"rsvp","author":{"name":"Ed"}}
                ]}"#,
            );
    });

    let directory = TempDir::new().expect("temp dir");
    let cache = CacheConfig {
        directory: directory.path().to_path_buf(),
        ..CacheConfig::default()
    };
    let service = service(&server, &cache);

    let summary = service.mentions("https://blog.example/spring/").await;
    service.mentions("https://blog.example/spring/").await;

    mock.assert_hits(1);
    assert_eq!(summary.len(), 3);
    assert_eq!(summary.likes.len(), 2);
    assert_eq!(summary.replies.len(), 1);
    assert_eq!(summary.replies[0].kind, MentionKind::Reply);
    assert_eq!(summary.replies[0].content.as_deref(), Some("Lovely"));
}

#[tokio::test]
async fn unreachable_mappings_and_mentions_degrade_to_empty() {
    let server = MockServer::start();
    let mappings = server.mock(|when, then| {
        when.method("GET").path("/mappings.json");
        then.status(502);
    });
    let mentions = server.mock(|when, then| {
        when.method("GET").path("/api/mentions.jf2");
        then.status(500);
    });
    let any_status = server.mock(|when, then| {
        when.method("GET").path("/api/v1/statuses/111");
        then.status(200).body("{}");
    });

    let directory = TempDir::new().expect("temp dir");
    let cache = CacheConfig {
        directory: directory.path().to_path_buf(),
        ..CacheConfig::default()
    };
    let service = service(&server, &cache);

    let summary = service.summary("/spring/").await;
    service.summary("/spring/").await;
    let found = service.mentions("https://blog.example/spring/").await;

    assert!(summary.is_empty());
    assert_eq!(summary.combined(), EngagementCounts::default());
    assert!(found.is_empty());
    // Failures are not cached, so each call retries.
    mappings.assert_hits(2);
    mentions.assert_hits(1);
    any_status.assert_hits(0);
}
