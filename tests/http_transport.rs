// tests/http_transport.rs
//
// reqwest transport and the pageviews provider against a local wiremock server.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wikitrends::cache::ResponseCache;
use wikitrends::config::HttpSettings;
use wikitrends::fetch::{FetchError, HttpTransport, ResilientFetcher, RetryPolicy, Transport};
use wikitrends::ingest::providers::pageviews::PageviewsProvider;
use wikitrends::Language;

fn transport() -> HttpTransport {
    HttpTransport::new(&HttpSettings::default()).expect("client")
}

#[tokio::test]
async fn ok_json_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hello": "world"})))
        .mount(&server)
        .await;

    let v = transport()
        .get_json(&format!("{}/ok", server.uri()))
        .await
        .expect("200 json");
    assert_eq!(v["hello"], "world");
}

#[tokio::test]
async fn non_success_status_is_upstream_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let url = format!("{}/missing", server.uri());
    let err = transport().get_json(&url).await.unwrap_err();
    assert_eq!(err, FetchError::UpstreamStatus { url, status: 404 });
}

#[tokio::test]
async fn garbage_body_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/garbage"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let err = transport()
        .get_json(&format!("{}/garbage", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Parse { .. }), "got {err:?}");
}

#[tokio::test]
async fn provider_reads_top_snapshot_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/top/fr.wikipedia/all-access/2024/03/09"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{"articles": [
                {"article": "Genève", "views": 9000, "rank": 1},
                {"article": "Lausanne", "views": 7000, "rank": 2}
            ]}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let fetcher = ResilientFetcher::new(
        Arc::new(transport()),
        Arc::new(ResponseCache::default()),
        Duration::from_secs(60),
        RetryPolicy::default(),
    );
    let provider = PageviewsProvider::new(fetcher, server.uri());
    let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

    let first = provider.top_snapshot(Language::Fr, day).await.expect("snapshot");
    let second = provider.top_snapshot(Language::Fr, day).await.expect("cached snapshot");
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].identifier, "Genève");
    assert_eq!(first[1].rank, Some(2));
    // `.expect(1)` on the mock is verified when the server drops
}
