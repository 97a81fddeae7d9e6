//! Integration tests for a full refresh cycle through a mocked fetch proxy.
//!
//! Each test starts its own wiremock server standing in for the proxy. The
//! source URLs are never contacted directly; the proxy is matched on the
//! `url` query parameter.

use glean::feed::{toggle_favorite, Aggregator, FetchSettings, ItemFilter};
use glean::types::{Item, Source};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WORLD_FEED: &str = "https://world.example.com/rss.xml";
const TECH_FEED: &str = "https://tech.example.com/rss.xml";
const BROKEN_FEED: &str = "https://broken.example.com/rss.xml";
const GARBAGE_FEED: &str = "https://garbage.example.com/rss.xml";

const WORLD_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item>
    <title>Senate passes budget</title>
    <description><![CDATA[<p>The <b>vote</b> was close.</p>]]></description>
    <link>https://world.example.com/budget</link>
    <pubDate>Tue, 03 Jun 2025 09:00:00 GMT</pubDate>
  </item>
  <item>
    <title>Shared wire story</title>
    <link>https://wire.example.com/story</link>
    <pubDate>Mon, 02 Jun 2025 08:00:00 GMT</pubDate>
  </item>
  <item>
    <title>Undated notice</title>
    <link>https://world.example.com/notice</link>
    <pubDate>sometime soon</pubDate>
  </item>
</channel></rss>"#;

const TECH_RSS: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <item>
    <title>New software release</title>
    <description>Faster builds &amp; smaller binaries</description>
    <link>https://tech.example.com/release</link>
    <pubDate>Tue, 03 Jun 2025 12:00:00 GMT</pubDate>
    <enclosure url="https://tech.example.com/release.jpg" type="image/jpeg" length="1"/>
  </item>
  <item>
    <title>Shared wire story</title>
    <link>https://wire.example.com/story</link>
    <pubDate>Mon, 02 Jun 2025 08:00:00 GMT</pubDate>
  </item>
</channel></rss>"#;

async fn proxy() -> MockServer {
    let server = MockServer::start().await;

    for (feed, body) in [(WORLD_FEED, WORLD_RSS), (TECH_FEED, TECH_RSS)] {
        Mock::given(method("GET"))
            .and(path("/get"))
            .and(query_param("url", feed))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "contents": body,
                "status": { "http_code": 200 }
            })))
            .expect(1)
            .mount(&server)
            .await;
    }

    Mock::given(method("GET"))
        .and(query_param("url", BROKEN_FEED))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(query_param("url", GARBAGE_FEED))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "contents": "<rss><item></rss>" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    server
}

fn aggregator(server: &MockServer) -> Aggregator {
    Aggregator::new(
        reqwest::Client::new(),
        FetchSettings {
            proxy_url: format!("{}/get", server.uri()),
            ..FetchSettings::default()
        },
    )
}

fn sources() -> Vec<Source> {
    vec![
        Source::new("1", WORLD_FEED, "World Desk"),
        Source::new("2", BROKEN_FEED, "Broken"),
        Source::new("3", TECH_FEED, "Tech Desk"),
        Source::new("4", GARBAGE_FEED, "Garbage"),
    ]
}

fn links(items: &[Item]) -> Vec<&str> {
    items.iter().map(|i| i.link.as_str()).collect()
}

#[tokio::test]
async fn test_cycle_survives_partial_failure() {
    let server = proxy().await;
    let items = aggregator(&server).refresh(&sources(), &[]).await.unwrap();

    assert_eq!(
        links(&items),
        vec![
            "https://tech.example.com/release",
            "https://world.example.com/budget",
            "https://wire.example.com/story",
            "https://world.example.com/notice",
        ]
    );
}

#[tokio::test]
async fn test_items_are_normalized_and_classified() {
    let server = proxy().await;
    let items = aggregator(&server).refresh(&sources(), &[]).await.unwrap();

    let budget = items
        .iter()
        .find(|i| i.link == "https://world.example.com/budget")
        .unwrap();
    assert_eq!(budget.category, "Politics");
    assert_eq!(budget.description, "The vote was close.");
    assert_eq!(budget.source, "World Desk");

    let release = items
        .iter()
        .find(|i| i.link == "https://tech.example.com/release")
        .unwrap();
    assert_eq!(release.category, "Technology");
    assert_eq!(release.description, "Faster builds & smaller binaries");
    assert_eq!(
        release.image.as_deref(),
        Some("https://tech.example.com/release.jpg")
    );

    let undated = items.last().unwrap();
    assert_eq!(undated.pub_date, "sometime soon");
    assert!(undated.published.is_none());
}

#[tokio::test]
async fn test_favorites_survive_second_cycle() {
    let server = proxy().await;
    let agg = aggregator(&server);

    let mut first = agg.refresh(&sources(), &[]).await.unwrap();
    let id = first
        .iter()
        .find(|i| i.link == "https://wire.example.com/story")
        .map(|i| i.id.clone())
        .unwrap();
    assert_eq!(toggle_favorite(&mut first, &id), Some(true));

    // Every mock above expects exactly one hit, so the second cycle needs a
    // fresh proxy.
    let server = proxy().await;
    let second = aggregator(&server).refresh(&sources(), &first).await.unwrap();

    let favorites = ItemFilter {
        favorites_only: true,
        ..Default::default()
    }
    .apply(&second);
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].link, "https://wire.example.com/story");
    // Ids are regenerated each cycle; only the link carries identity.
    assert_ne!(favorites[0].id, id);
}
