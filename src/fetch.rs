//! Resilient fetcher: response cache + exponential-backoff retry around a JSON transport.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use metrics::{counter, histogram};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::config::{HttpSettings, RetrySettings};

/// Failures of a single upstream call. All kinds are retried alike.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("transport failure for {url}: {message}")]
    Transport { url: String, message: String },
    #[error("upstream returned HTTP {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },
    #[error("malformed payload from {url}: {message}")]
    Parse { url: String, message: String },
}

impl FetchError {
    pub fn parse(url: &str, message: impl ToString) -> Self {
        FetchError::Parse {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

/// Low-level remote call. Separated so the fetcher can run against HTTP in
/// production and a scripted double in tests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError>;
    fn name(&self) -> &'static str;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(settings: &HttpSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str) -> Result<Value, FetchError> {
        let resp = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::UpstreamStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&body).map_err(|e| FetchError::parse(url, e))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Bounded retries with doubling delay: `base * 2^(retry-1)`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first call included.
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn from_settings(s: &RetrySettings) -> Self {
        Self {
            max_attempts: s.max_attempts.max(1),
            base_delay: Duration::from_millis(s.base_delay_ms),
            max_delay: Duration::from_millis(s.max_delay_ms),
        }
    }

    /// Delay before retry number `retry` (1-based). Non-decreasing in `retry`.
    pub fn delay_for_retry(&self, retry: usize) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let shift = (retry - 1).min(31) as u32;
        self.base_delay
            .saturating_mul(1u32 << shift)
            .min(self.max_delay)
    }
}

/// Cache-first fetcher shared by every pipeline stage.
#[derive(Clone)]
pub struct ResilientFetcher {
    transport: Arc<dyn Transport>,
    cache: Arc<ResponseCache>,
    ttl: Duration,
    retry: RetryPolicy,
}

impl ResilientFetcher {
    pub fn new(
        transport: Arc<dyn Transport>,
        cache: Arc<ResponseCache>,
        ttl: Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            cache,
            ttl,
            retry,
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Raw JSON variant of [`Self::fetch_parsed`]: any well-formed JSON body counts.
    pub async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        self.fetch_parsed(url, |_, v| Ok(v.clone())).await
    }

    /// Fresh cache hit, else up to `max_attempts` remote calls. `parse` runs inside
    /// the retry loop: a payload it rejects uses up an attempt and is never cached.
    /// The last error surfaces once attempts are exhausted.
    pub async fn fetch_parsed<T, F>(&self, url: &str, parse: F) -> Result<T, FetchError>
    where
        F: Fn(&str, &Value) -> Result<T, FetchError>,
    {
        if let Some(entry) = self.cache.get(url) {
            if entry.is_fresh(self.ttl) {
                if let Ok(parsed) = parse(url, &entry.value) {
                    counter!("wikitrends_cache_hits_total").increment(1);
                    debug!(target: "fetch", %url, "cache hit");
                    return Ok(parsed);
                }
                debug!(target: "fetch", %url, "cached payload rejected by parser");
            } else {
                let age_ms = entry.age().as_millis() as u64;
                debug!(target: "fetch", %url, age_ms, "stale entry");
            }
        }
        counter!("wikitrends_cache_misses_total").increment(1);

        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let t0 = Instant::now();
            let outcome = self
                .transport
                .get_json(url)
                .await
                .and_then(|value| parse(url, &value).map(|parsed| (value, parsed)));
            match outcome {
                Ok((value, parsed)) => {
                    histogram!("wikitrends_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
                    self.cache.put(url, value);
                    return Ok(parsed);
                }
                Err(e) if attempt >= max_attempts => {
                    counter!("wikitrends_fetch_failures_total").increment(1);
                    warn!(
                        target: "fetch",
                        %url, attempts = attempt, transport = self.transport.name(),
                        error = %e, "giving up"
                    );
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.retry.delay_for_retry(attempt);
                    counter!("wikitrends_fetch_retries_total").increment(1);
                    debug!(
                        target: "fetch",
                        %url, attempt, delay_ms = delay.as_millis() as u64,
                        error = %e, "retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
