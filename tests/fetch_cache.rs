// tests/fetch_cache.rs
//
// Resilient fetcher against a scripted transport: cache hits, FIFO eviction,
// stale refetch, retry until success, retry exhaustion, payloads that fail the
// typed decode, and concurrent use of one shared cache.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use common::ScriptedTransport;
use wikitrends::cache::ResponseCache;
use wikitrends::fetch::{FetchError, ResilientFetcher, RetryPolicy};
use wikitrends::ingest::providers::pageviews::parse_top_snapshot;

fn quick_retry(max_attempts: usize) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(4),
    }
}

fn fetcher(
    transport: Arc<ScriptedTransport>,
    capacity: usize,
    ttl: Duration,
    attempts: usize,
) -> ResilientFetcher {
    ResilientFetcher::new(
        transport,
        Arc::new(ResponseCache::with_capacity(capacity)),
        ttl,
        quick_retry(attempts),
    )
}

#[tokio::test]
async fn fresh_entry_is_served_without_remote_call() {
    let t = Arc::new(ScriptedTransport::new().route("/a", json!({"n": 1})));
    let f = fetcher(t.clone(), 10, Duration::from_secs(60), 3);

    assert_eq!(f.fetch("http://x/a").await.unwrap(), json!({"n": 1}));
    assert_eq!(f.fetch("http://x/a").await.unwrap(), json!({"n": 1}));
    assert_eq!(t.calls().len(), 1, "second fetch must be a cache hit");
}

#[tokio::test]
async fn stale_entry_triggers_fresh_call() {
    let t = Arc::new(ScriptedTransport::new().route("/a", json!({"n": 1})));
    let f = fetcher(t.clone(), 10, Duration::from_millis(20), 3);

    f.fetch("http://x/a").await.unwrap();
    tokio::time::sleep(Duration::from_millis(40)).await;
    f.fetch("http://x/a").await.unwrap();
    assert_eq!(t.calls_matching("/a"), 2);
}

#[tokio::test]
async fn full_cache_evicts_first_inserted_key() {
    let t = Arc::new(
        ScriptedTransport::new()
            .route("/a", json!("a"))
            .route("/b", json!("b"))
            .route("/c", json!("c")),
    );
    let f = fetcher(t.clone(), 2, Duration::from_secs(60), 1);

    for u in ["http://x/a", "http://x/b", "http://x/c"] {
        f.fetch(u).await.unwrap();
    }
    let cache = f.cache();
    assert_eq!(cache.len(), 2);
    assert!(!cache.contains("http://x/a"), "oldest key must be evicted");
    assert!(cache.contains("http://x/b"));
    assert!(cache.contains("http://x/c"));

    // evicted entry goes back upstream
    f.fetch("http://x/a").await.unwrap();
    assert_eq!(t.calls_matching("/a"), 2);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let t = Arc::new(ScriptedTransport::new().failing("/flaky", 2, json!({"ok": true})));
    let f = fetcher(t.clone(), 10, Duration::from_secs(60), 3);

    let v = f.fetch("http://x/flaky").await.expect("third attempt succeeds");
    assert_eq!(v, json!({"ok": true}));
    assert_eq!(t.calls().len(), 3);
    assert!(f.cache().contains("http://x/flaky"));
}

#[tokio::test]
async fn exhausted_retries_surface_last_error_and_cache_nothing() {
    let t = Arc::new(ScriptedTransport::new().failing("/down", 10, json!(null)));
    let f = fetcher(t.clone(), 10, Duration::from_secs(60), 3);

    let err = f.fetch("http://x/down").await.unwrap_err();
    assert_eq!(
        err,
        FetchError::UpstreamStatus {
            url: "http://x/down".into(),
            status: 503
        }
    );
    assert_eq!(t.calls().len(), 3, "exactly max_attempts calls");
    assert!(f.cache().is_empty());
}

fn wrong_shape() -> Value {
    json!({"items": [{"articles": [{"article": "Bern", "views": "x"}]}]})
}

fn good_top() -> Value {
    json!({"items": [{"articles": [{"article": "Bern", "views": 42, "rank": 1}]}]})
}

#[tokio::test]
async fn undecodable_payload_is_retried_like_any_failure() {
    let replies = vec![wrong_shape(), wrong_shape(), good_top()];
    let t = Arc::new(ScriptedTransport::new().sequence("/top", replies));
    let f = fetcher(t.clone(), 10, Duration::from_secs(60), 3);

    let snap = f
        .fetch_parsed("http://x/top", parse_top_snapshot)
        .await
        .expect("third payload decodes");
    assert_eq!(snap.len(), 1);
    assert_eq!(snap[0].view_count, 42);
    assert_eq!(t.calls().len(), 3);
    assert_eq!(f.cache().get("http://x/top").unwrap().value, good_top());
}

#[tokio::test]
async fn undecodable_payload_is_never_cached() {
    let t = Arc::new(ScriptedTransport::new().route("/top", wrong_shape()));
    let f = fetcher(t.clone(), 10, Duration::from_secs(60), 3);

    let err = f
        .fetch_parsed("http://x/top", parse_top_snapshot)
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Parse { .. }), "got {err:?}");
    assert_eq!(t.calls().len(), 3, "parse failures use up attempts");
    assert!(f.cache().is_empty());

    // next request goes upstream again instead of hitting a poisoned entry
    assert!(f.fetch_parsed("http://x/top", parse_top_snapshot).await.is_err());
    assert_eq!(t.calls().len(), 6);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn shared_cache_stays_bounded_under_concurrent_fetches() {
    let t = Arc::new(ScriptedTransport::new().route("http://x/", json!({"ok": true})));
    let cache = Arc::new(ResponseCache::with_capacity(8));
    let f = ResilientFetcher::new(
        t.clone(),
        cache.clone(),
        Duration::from_secs(60),
        quick_retry(1),
    );

    let mut handles = Vec::new();
    for i in 0..200 {
        let f = f.clone();
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            let url = format!("http://x/{i}");
            f.fetch(&url).await.expect("scripted route answers");
            cache.put(format!("direct-{i}"), json!(i));
            let _ = cache.get(&url);
        }));
    }
    for h in handles {
        h.await.expect("task");
    }

    assert!(cache.len() <= cache.capacity());
    assert_eq!(cache.len(), 8, "a full cache stays full");
    assert_eq!(t.calls().len(), 200);
}
