//! End-to-end tests for the two binaries: exit codes, stdout and stderr.

use chrono::{TimeDelta, Utc};
use hn_digest::Article;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const FETCH_FEEDS: &str = env!("CARGO_BIN_EXE_fetch-feeds");
const GENERATE_DIGEST: &str = env!("CARGO_BIN_EXE_generate-digest");

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hn_digest_cli_{}", name));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn rss(title: &str, minutes_ago: i64) -> String {
    let published = Utc::now() - TimeDelta::minutes(minutes_ago);
    format!(
        r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title>
<item><title>{title}</title><link>https://example.com/{title}</link><pubDate>{}</pubDate></item>
</channel></rss>"#,
        published.to_rfc2822()
    )
}

async fn run_digest(args: &[&str], stdin: &str) -> std::process::Output {
    let mut child = Command::new(GENERATE_DIGEST)
        .args(args)
        .arg("--config")
        .arg("/tmp/hn_digest_cli_no_such_config.toml")
        .env("RUST_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    let mut input = child.stdin.take().unwrap();
    input.write_all(stdin.as_bytes()).await.unwrap();
    drop(input);

    child.wait_with_output().await.unwrap()
}

#[tokio::test]
async fn test_fetch_feeds_partial_failure_exits_zero() {
    let server = MockServer::start().await;
    for (route, title, minutes) in [("/a", "a1", 10), ("/b", "b1", 20), ("/c", "c1", 5)] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(rss(title, minutes)))
            .mount(&server)
            .await;
    }

    let dir = temp_dir("partial_failure");
    let feeds = dir.join("feeds.json");
    let list = serde_json::json!([
        {"name": "A", "xmlUrl": format!("{}/a", server.uri())},
        {"name": "Down 1", "xmlUrl": "http://127.0.0.1:1/feed"},
        {"name": "B", "xmlUrl": format!("{}/b", server.uri())},
        {"name": "Down 2", "xmlUrl": "http://127.0.0.1:1/other"},
        {"name": "C", "xmlUrl": format!("{}/c", server.uri())},
    ]);
    std::fs::write(&feeds, list.to_string()).unwrap();

    let output = Command::new(FETCH_FEEDS)
        .arg("--feeds")
        .arg(&feeds)
        .arg("--config")
        .arg(dir.join("missing.toml"))
        .env("RUST_LOG", "warn")
        .output()
        .await
        .unwrap();

    assert!(output.status.success());

    // stdout is nothing but the JSON array
    let articles: Vec<Article> = serde_json::from_slice(&output.stdout).unwrap();
    let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, vec!["c1", "a1", "b1"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    let warnings = stderr
        .lines()
        .filter(|line| line.contains("Failed to fetch feed"))
        .count();
    assert_eq!(warnings, 2);
    assert!(stderr.contains("Down 1"));
    assert!(stderr.contains("Down 2"));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_fetch_feeds_missing_feed_list_exits_nonzero() {
    let dir = temp_dir("missing_list");
    let output = Command::new(FETCH_FEEDS)
        .arg("--feeds")
        .arg(dir.join("no_such_feeds.json"))
        .arg("--config")
        .arg(dir.join("missing.toml"))
        .output()
        .await
        .unwrap();

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_generate_digest_empty_input() {
    let output = run_digest(&[], "[]").await;
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "过去24小时没有新文章。\n");

    let output = run_digest(&["--lang", "en", "--format", "dingtalk"], "[]").await;
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        "No new articles in the past 24 hours.\n"
    );
}

#[tokio::test]
async fn test_generate_digest_malformed_input_exits_nonzero() {
    let output = run_digest(&[], "{\"not\": \"an array\"}").await;
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());

    let output = run_digest(&[], "garbage").await;
    assert!(!output.status.success());
}

#[tokio::test]
async fn test_generate_digest_dingtalk_is_compact_by_default() {
    let input = r#"[{"title": "T", "link": "https://example.com/t",
        "published": "2025-03-01T11:45:00+00:00", "feed": "Blog", "summary": "S"}]"#;

    let output = run_digest(&["-f", "dingtalk", "-l", "en"], input).await;
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("> from Blog 11:45\n"));

    let output = run_digest(&["-f", "dingtalk", "-l", "en", "--full-time"], input).await;
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("> from Blog 2025-03-01 11:45\n"));
}
