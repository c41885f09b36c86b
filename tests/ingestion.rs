//! Integration tests for the ingestion loop: feeds served by a mock HTTP
//! server are fetched, parsed and stored, then read back through `browse`.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gator::aggregator::{run, IngestError, Ingester, Interval};
use gator::commands::{self, AppContext, Command};
use gator::config::Config;
use gator::feed::{FeedClient, FetchError, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT};
use gator::storage::Database;

const LANES_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
<channel>
  <title>Lane&apos;s Blog</title>
  <link>https://wagslane.dev</link>
  <description>Recent content</description>
  <atom:link href="https://wagslane.dev/index.xml" rel="self" type="application/rss+xml"/>
  <item>
    <title>The Zen of Proverbs</title>
    <link>https://wagslane.dev/posts/zen-of-proverbs/</link>
    <pubDate>Sun, 17 Sep 2023 00:00:00 +0000</pubDate>
    <description>20 rules of thumb for writing better software.</description>
  </item>
  <item>
    <title>Tech &amp; Tools</title>
    <link>https://wagslane.dev/posts/tech-and-tools/</link>
    <pubDate>Mon, 2 Jan 2006 15:04:05 -0700</pubDate>
    <description><![CDATA[<p>Bold &amp; brave</p>]]></description>
  </item>
  <item>
    <title>Undated</title>
    <link>https://wagslane.dev/posts/undated/</link>
    <pubDate>sometime last week</pubDate>
  </item>
</channel>
</rss>"#;

fn client() -> FeedClient {
    FeedClient::new(DEFAULT_TIMEOUT, DEFAULT_USER_AGENT).unwrap()
}

async fn serve(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("User-Agent", "gator"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
        .mount(server)
        .await;
}

/// A user `kahya` following one feed per url; returns the feed ids.
async fn seed(db: &Database, urls: &[String]) -> Vec<i64> {
    let user = db.create_user("kahya").await.unwrap();
    let mut ids = Vec::new();
    for (i, url) in urls.iter().enumerate() {
        let feed = db.create_feed(&format!("feed {i}"), url, user.id).await.unwrap();
        db.create_feed_follow(user.id, feed.id).await.unwrap();
        ids.push(feed.id);
    }
    ids
}

#[tokio::test]
async fn test_fetched_posts_show_up_in_browse() {
    let server = MockServer::start().await;
    serve(&server, "/index.xml", LANES_FEED).await;

    let db = Database::open(":memory:").await.unwrap();
    let ids = seed(&db, &[format!("{}/index.xml", server.uri())]).await;

    let ingester = Ingester::new(db.clone(), client());
    let result = ingester.run_once().await.unwrap();
    assert_eq!(result.items_seen, 3);
    assert_eq!(result.items_inserted, 2);
    assert_eq!(result.items_skipped, 1);

    let posts = db.get_posts_for_feed(ids[0]).await.unwrap();
    let titles: Vec<&str> = posts.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["The Zen of Proverbs", "Tech & Tools"]);
    assert_eq!(
        posts[1].published(),
        Some(Utc.with_ymd_and_hms(2006, 1, 2, 22, 4, 5).unwrap())
    );
    assert_eq!(posts[1].description.as_deref(), Some("<p>Bold & brave</p>"));

    let config = Config {
        current_user_name: Some("kahya".to_string()),
        ..Default::default()
    };
    let mut ctx = AppContext::new(db, config, "/nonexistent/config.toml".into());
    let mut out = Vec::new();
    commands::run(&mut ctx, Command::Browse { limit: 5 }, &mut out)
        .await
        .unwrap();
    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("The Zen of Proverbs\n"), "{out}");
    assert!(out.contains("https://wagslane.dev/posts/tech-and-tools/"));
    assert!(!out.contains("Undated"));
}

#[tokio::test]
async fn test_refetch_is_idempotent() {
    let server = MockServer::start().await;
    serve(&server, "/index.xml", LANES_FEED).await;

    let db = Database::open(":memory:").await.unwrap();
    let ids = seed(&db, &[format!("{}/index.xml", server.uri())]).await;
    let ingester = Ingester::new(db.clone(), client());

    ingester.run_once().await.unwrap();
    let before: Vec<i64> = db
        .get_posts_for_feed(ids[0])
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();

    let again = ingester.run_once().await.unwrap();
    assert_eq!(again.items_inserted, 0);

    let after: Vec<i64> = db
        .get_posts_for_feed(ids[0])
        .await
        .unwrap()
        .iter()
        .map(|p| p.id)
        .collect();
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_one_broken_feed_does_not_stall_the_rotation() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/broken.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;
    serve(&server, "/index.xml", LANES_FEED).await;

    let db = Database::open(":memory:").await.unwrap();
    let broken = format!("{}/broken.xml", server.uri());
    let ids = seed(&db, &[broken.clone(), format!("{}/index.xml", server.uri())]).await;
    let ingester = Ingester::new(db.clone(), client());

    let err = ingester.run_once().await.unwrap_err();
    match err {
        IngestError::Fetch { feed_id, source, .. } => {
            assert_eq!(feed_id, ids[0]);
            assert!(matches!(source, FetchError::Parse(_)), "{source:?}");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    tokio::time::sleep(Duration::from_millis(5)).await;
    let result = ingester.run_once().await.unwrap();
    assert_eq!(result.items_inserted, 2);

    let feed = db.get_feed_by_url(&broken).await.unwrap().unwrap();
    assert!(feed.last_error.is_some());
    assert_eq!(db.get_posts_for_feed(ids[1]).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_driver_keeps_going_after_failed_ticks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let db = Database::open(":memory:").await.unwrap();
    seed(&db, &[format!("{}/down.xml", server.uri())]).await;
    let mut ingester = Ingester::new(db.clone(), client());

    let interval = Interval::parse("50ms").unwrap();
    let _ = tokio::time::timeout(Duration::from_millis(180), run(interval, &mut ingester)).await;

    let requests = server.received_requests().await.unwrap();
    assert!(requests.len() >= 3, "only {} requests", requests.len());
}
