//! Integration tests for `NewsClient` using wiremock HTTP mocks.

mod common;

use chrono::{Duration, Utc};
use pulse_collect::sources::NewsClient;
use pulse_collect::CollectError;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{test_config, test_limiter};

fn articles_body(urls: &[&str]) -> serde_json::Value {
    let articles: Vec<serde_json::Value> = urls
        .iter()
        .map(|url| {
            serde_json::json!({
                "source": { "id": "bbc-news", "name": "BBC News" },
                "title": format!("Headline for {url}"),
                "description": "Some description text",
                "url": url,
                "publishedAt": Utc::now().to_rfc3339()
            })
        })
        .collect();
    serde_json::json!({
        "status": "ok",
        "totalResults": articles.len(),
        "articles": articles
    })
}

fn test_client(server: &MockServer) -> NewsClient {
    NewsClient::with_base_url(&test_config(), test_limiter("news"), &server.uri())
        .expect("client construction should not fail")
}

#[tokio::test]
async fn fetch_everything_parses_articles() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .and(query_param("q", "artificial intelligence"))
        .and(header("X-Api-Key", "test-news-key"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(articles_body(&["https://n.example/one"])),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let items = client
        .fetch_everything("artificial intelligence", 50, Utc::now() - Duration::hours(24))
        .await
        .expect("should parse articles");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].origin_id, "https://n.example/one");
    assert_eq!(items[0].community, "bbc news");
    assert_eq!(items[0].engagement, 0);
}

#[tokio::test]
async fn removed_articles_are_skipped() {
    let server = MockServer::start().await;
    let body = serde_json::json!({
        "status": "ok",
        "articles": [
            {
                "source": { "id": null, "name": "[Removed]" },
                "title": "[Removed]",
                "description": "[Removed]",
                "url": "https://removed.example",
                "publishedAt": null
            },
            {
                "source": { "id": "cnn", "name": "CNN" },
                "title": "Real headline",
                "description": "Real description",
                "url": "https://n.example/real",
                "publishedAt": Utc::now().to_rfc3339()
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let items = client
        .fetch_everything("technology", 50, Utc::now() - Duration::hours(24))
        .await
        .expect("should parse articles");

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].origin_id, "https://n.example/real");
}

#[tokio::test]
async fn collect_dedups_articles_across_topics() {
    let server = MockServer::start().await;
    // Both topics return the same article URL.
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(articles_body(&["https://n.example/dup"])),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let items = client
        .collect(
            &["technology".to_string(), "science".to_string()],
            &[],
            50,
            Utc::now() - Duration::hours(24),
        )
        .await
        .expect("collect");

    assert_eq!(items.len(), 1, "duplicate URL across topics stored once");
}

#[tokio::test]
async fn collect_caps_batch_at_article_limit() {
    let server = MockServer::start().await;
    let urls: Vec<String> = (0..10).map(|i| format!("https://n.example/{i}")).collect();
    let url_refs: Vec<&str> = urls.iter().map(String::as_str).collect();
    Mock::given(method("GET"))
        .and(path("/v2/everything"))
        .respond_with(ResponseTemplate::new(200).set_body_json(articles_body(&url_refs)))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let items = client
        .collect(
            &["technology".to_string()],
            &[],
            3,
            Utc::now() - Duration::hours(24),
        )
        .await
        .expect("collect");
    assert_eq!(items.len(), 3);
}

#[tokio::test]
async fn rejected_api_key_surfaces_as_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client
        .collect(
            &["technology".to_string()],
            &[],
            50,
            Utc::now() - Duration::hours(24),
        )
        .await;
    assert!(
        matches!(result, Err(CollectError::Auth { source_name: "news", .. })),
        "expected Auth error, got: {result:?}"
    );
}

#[tokio::test]
async fn collect_reports_source_unavailable_when_all_topics_fail() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let result = client
        .collect(
            &["technology".to_string(), "science".to_string()],
            &[],
            50,
            Utc::now() - Duration::hours(24),
        )
        .await;
    assert!(
        matches!(
            result,
            Err(CollectError::SourceUnavailable { source_name: "news", attempts: 2, .. })
        ),
        "expected SourceUnavailable, got: {result:?}"
    );
}

#[tokio::test]
async fn top_headlines_requests_watched_outlets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/top-headlines"))
        .and(query_param("sources", "bbc-news,reuters"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(articles_body(&["https://n.example/head"])),
        )
        .mount(&server)
        .await;

    let client = test_client(&server);
    let items = client
        .fetch_top_headlines(&["bbc-news".to_string(), "reuters".to_string()], 50)
        .await
        .expect("headlines");
    assert_eq!(items.len(), 1);
}
