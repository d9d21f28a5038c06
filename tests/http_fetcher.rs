use std::sync::Arc;
use std::time::Duration;

use canopy::app::{AppContext, CanopyError};
use canopy::fetcher::{Fetcher, HttpFetcher};
use canopy::store::SqliteStore;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn rss(ids: &[&str]) -> String {
    let items: String = ids
        .iter()
        .map(|id| {
            format!(
                "<item><title>Item {id}</title><link>http://example.com/{id}</link><guid>{id}</guid></item>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>http://example.com/</link>
    {items}
  </channel>
</rss>"#
    )
}

async fn serve(server: &MockServer, body: String) {
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/rss+xml")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(2), "canopy-test").unwrap()
}

#[tokio::test]
async fn fetch_returns_body_and_sends_user_agent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(header("user-agent", "canopy-test"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
        .mount(&server)
        .await;

    let body = fetcher()
        .fetch(&format!("{}/feed", server.uri()))
        .await
        .unwrap();
    assert_eq!(body, b"hello");
}

#[tokio::test]
async fn fetch_fails_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = fetcher()
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, CanopyError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn fetch_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let slow = HttpFetcher::new(Duration::from_millis(200), "canopy-test").unwrap();
    let err = slow.fetch(&server.uri()).await.unwrap_err();
    assert!(matches!(err, CanopyError::Http(_)));
}

#[tokio::test]
async fn subscribe_then_update_over_http() {
    let server = MockServer::start().await;
    serve(&server, rss(&["3", "2", "1"])).await;

    let ctx = AppContext::with_parts(
        Arc::new(SqliteStore::in_memory().unwrap()),
        Arc::new(fetcher()),
        4,
    );
    let root = ctx.registry.ensure_root("alice").unwrap();
    let url = format!("{}/feed", server.uri());

    let reg = ctx
        .engine
        .subscribe("alice", &url, root)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(ctx.registry.feed(reg.key).unwrap().entries.len(), 3);

    server.reset().await;
    serve(&server, rss(&["5", "4", "3", "2", "1"])).await;

    let counts = ctx.tree.update_folder(root).await.unwrap();
    assert_eq!(counts.values().copied().collect::<Vec<_>>(), vec![5]);

    let feed = ctx.registry.feed(reg.key).unwrap();
    assert_eq!(feed.final_entry.as_deref(), Some("5"));
    assert_eq!(ctx.registry.entry_count(root).unwrap(), 5);
}
