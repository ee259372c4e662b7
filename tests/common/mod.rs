// tests/common/mod.rs
//
// Shared fixtures: a scripted in-memory Transport plus payload builders
// shaped like the Wikimedia APIs.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};

use wikitrends::config::Settings;
use wikitrends::fetch::{FetchError, Transport};
use wikitrends::relevance::SwissVocabulary;
use wikitrends::TrendEngine;

struct Route {
    needle: String,
    /// Served front to back; the last one repeats.
    responses: Vec<Value>,
    failures_left: usize,
}

/// Answers by the first route whose needle occurs in the URL; unknown URLs get a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, needle: &str, response: Value) -> Self {
        self.failing(needle, 0, response)
    }

    /// Fails `times` calls with HTTP 503, then answers with `response`.
    pub fn failing(self, needle: &str, times: usize, response: Value) -> Self {
        self.routes.lock().unwrap().push(Route {
            needle: needle.to_string(),
            responses: vec![response],
            failures_left: times,
        });
        self
    }

    /// Answers with `responses` in order, repeating the last one.
    pub fn sequence(self, needle: &str, responses: Vec<Value>) -> Self {
        assert!(!responses.is_empty(), "sequence needs at least one response");
        self.routes.lock().unwrap().push(Route {
            needle: needle.to_string(),
            responses,
            failures_left: 0,
        });
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, needle: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|u| u.contains(needle))
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        let mut routes = self.routes.lock().unwrap();
        let Some(route) = routes.iter_mut().find(|r| url.contains(&r.needle)) else {
            return Err(FetchError::UpstreamStatus {
                url: url.to_string(),
                status: 404,
            });
        };
        if route.failures_left > 0 {
            route.failures_left -= 1;
            return Err(FetchError::UpstreamStatus {
                url: url.to_string(),
                status: 503,
            });
        }
        if route.responses.len() > 1 {
            return Ok(route.responses.remove(0));
        }
        Ok(route.responses[0].clone())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Defaults with millisecond backoff so retry paths stay fast.
pub fn fast_settings() -> Settings {
    let mut s = Settings::default();
    s.retry.base_delay_ms = 1;
    s.retry.max_delay_ms = 4;
    s
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
}

pub fn engine_over(transport: Arc<ScriptedTransport>) -> TrendEngine {
    let vocab = SwissVocabulary::embedded().expect("embedded vocabulary");
    TrendEngine::with_transport(&fast_settings(), transport, vocab).with_today(today())
}

/// Top-list payload; ranks follow slice order.
pub fn top_payload(rows: &[(&str, u64)]) -> Value {
    let articles: Vec<Value> = rows
        .iter()
        .enumerate()
        .map(|(i, (id, views))| json!({"article": id, "views": views, "rank": i + 1}))
        .collect();
    json!({"items": [{"project": "de.wikipedia", "articles": articles}]})
}

/// Metadata payload: one page per `(title, categories)` with a short extract.
pub fn metadata_payload(pages: &[(&str, &[&str])]) -> Value {
    let pages: Vec<Value> = pages
        .iter()
        .map(|(title, cats)| {
            let categories: Vec<Value> = cats
                .iter()
                .map(|c| json!({"title": format!("Kategorie:{c}")}))
                .collect();
            json!({
                "title": title,
                "extract": format!("{title} ist ein Artikel."),
                "categories": categories,
            })
        })
        .collect();
    json!({"batchcomplete": true, "query": {"pages": pages}})
}
