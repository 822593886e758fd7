use std::io::Write;

use assert_cmd::Command;
use httpmock::MockServer;
use predicates::str::contains;
use tempfile::{NamedTempFile, TempDir};

const PAGE: &str = r#"<!doctype html>
<html><body>
<ul class="blog-posts">
  <li><a href="/rust-async/">Async Rust in practice</a><time datetime="2024-03-20">March 20, 2024</time></li>
  <li><a href="/tomatoes/">Growing tomatoes</a><time datetime="2024-03-02">March 2, 2024</time></li>
  <li><a href="/rust-errors/">Rust error handling</a><time datetime="2023-11-11">November 11, 2023</time></li>
</ul>
</body></html>"#;

fn html_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".html")
        .tempfile()
        .expect("tmp file");
    file.write_all(contents.as_bytes()).expect("write html");
    file
}

fn marginalia() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("marginalia"));
    cmd.env_remove("RUST_LOG")
        .env_remove("MARGINALIA_CONFIG_FILE")
        .env_remove("MARGINALIA__ENDPOINTS__MAPPINGS_URL");
    cmd
}

#[test]
fn list_filters_and_groups_posts() {
    let page = html_file(PAGE);

    let assert = marginalia()
        .arg("list")
        .arg(page.path())
        .args(["--search", "RUST"])
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("Async Rust in practice"));
    assert!(output.contains("Rust error handling"));
    assert!(!output.contains("Growing tomatoes"));
    assert!(output.contains("March 2024"));
    assert!(output.contains("November 2023"));
}

#[test]
fn list_without_container_fails_with_input_error() {
    let page = html_file("<html><body><p>no list here</p></body></html>");

    marginalia()
        .arg("list")
        .arg(page.path())
        .assert()
        .code(2)
        .stderr(contains("no post list found"));
}

#[test]
fn engagement_prints_json_summary() {
    let server = MockServer::start();
    let mappings = server.mock(|when, then| {
        when.method("GET").path("/mappings.json");
        then.status(200)
            .header("content-type", "application/json")
            .body(format!(
                r#"{{"/rust-async/":{{"mastodon":"{}/@alice/7"}}}}"#,
                server.base_url()
            ));
    });
    let status = server.mock(|when, then| {
        when.method("GET").path("/api/v1/statuses/7");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"favourites_count":5,"reblogs_count":1,"replies_count":2}"#);
    });
    let cache = TempDir::new().expect("cache dir");

    let assert = marginalia()
        .arg("--cache-directory")
        .arg(cache.path())
        .arg("engagement")
        .arg("https://blog.example/rust-async/")
        .arg("--mappings-url")
        .arg(format!("{}/mappings.json", server.base_url()))
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    let report: serde_json::Value = serde_json::from_str(&output).expect("json output");
    assert_eq!(report["combined"]["likes"], 5);
    assert_eq!(report["combined"]["replies"], 2);
    assert!(report["bluesky"].is_null());
    mappings.assert();
    status.assert();
}

#[test]
fn engagement_degrades_when_mappings_fail() {
    let server = MockServer::start();
    let mappings = server.mock(|when, then| {
        when.method("GET").path("/mappings.json");
        then.status(502);
    });
    let cache = TempDir::new().expect("cache dir");

    let assert = marginalia()
        .arg("--cache-directory")
        .arg(cache.path())
        .arg("engagement")
        .arg("https://blog.example/rust-async/")
        .arg("--mappings-url")
        .arg(format!("{}/mappings.json", server.base_url()))
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    let report: serde_json::Value = serde_json::from_str(&output).expect("json output");
    assert_eq!(report["post"], "https://blog.example/rust-async/");
    assert_eq!(report["combined"]["likes"], 0);
    assert_eq!(report["combined"]["reposts"], 0);
    assert_eq!(report["combined"]["replies"], 0);
    assert!(report["mastodon"].is_null());
    assert!(report["bluesky"].is_null());
    mappings.assert();
}

#[test]
fn engagement_requires_mappings_url() {
    marginalia()
        .arg("engagement")
        .arg("https://blog.example/rust-async/")
        .assert()
        .code(2)
        .stderr(contains("mappings_url"));
}
