// src/config/mod.rs
//! Runtime settings loaded from TOML, with a handful of env overrides.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::{env, fs, path::Path, path::PathBuf, time::Duration};

pub const DEFAULT_CONFIG_PATH: &str = "config/wikitrends.toml";
pub const ENV_CONFIG_PATH: &str = "WIKITRENDS_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub http: HttpSettings,
    pub cache: CacheSettings,
    pub retry: RetrySettings,
    pub trend: TrendSettings,
    pub relevance: RelevanceSettings,
    pub limits: LimitSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Wikimedia asks API clients to identify themselves.
    pub user_agent: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub pageviews_base_url: String,
    /// `{lang}` is replaced by the edition code.
    pub metadata_base_url: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            user_agent: "wikitrends/0.1 (most viewed and trending Wikipedia articles)".to_string(),
            connect_timeout_secs: 4,
            request_timeout_secs: 10,
            pageviews_base_url: "https://wikimedia.org/api/rest_v1/metrics/pageviews".to_string(),
            metadata_base_url: "https://{lang}.wikipedia.org/w/api.php".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: crate::cache::DEFAULT_CAPACITY,
            ttl_secs: crate::cache::DEFAULT_TTL.as_secs(),
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendSettings {
    /// Below this many previous views growth is not computed.
    pub reliability_floor: u64,
    pub high_current_views: u64,
    pub high_previous_views: u64,
}

impl Default for TrendSettings {
    fn default() -> Self {
        Self {
            reliability_floor: 100,
            high_current_views: 10_000,
            high_previous_views: 1_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceSettings {
    /// Keyword hits needed to skip the category stage.
    pub min_keyword_matches: usize,
    pub category_batch_size: usize,
    pub max_results: usize,
    /// Optional path to a vocabulary TOML; embedded default otherwise.
    pub vocabulary_path: Option<PathBuf>,
}

impl Default for RelevanceSettings {
    fn default() -> Self {
        Self {
            min_keyword_matches: 10,
            category_batch_size: 50,
            max_results: 50,
            vocabulary_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    pub max_results: usize,
    /// Upstream metadata API accepts at most this many titles per query.
    pub metadata_batch_size: usize,
    pub max_history_days: u32,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_results: 50,
            metadata_batch_size: 25,
            max_history_days: 365,
        }
    }
}

impl Settings {
    /// Resolve path from `WIKITRENDS_CONFIG_PATH` (or the default path), read it if it
    /// exists, then apply env overrides. A missing default file yields defaults.
    pub fn load() -> anyhow::Result<Self> {
        let explicit = env::var(ENV_CONFIG_PATH).ok().map(PathBuf::from);
        let path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut settings = if path.exists() {
            Self::load_from_file(&path)?
        } else if explicit.is_some() {
            anyhow::bail!("{ENV_CONFIG_PATH} points to non-existent path {}", path.display());
        } else {
            Self::default()
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_toml_str(&data).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let mut cfg: Settings = toml::from_str(s)?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse::<u64>("WIKITRENDS_CACHE_TTL_SECS") {
            self.cache.ttl_secs = v;
        }
        if let Some(v) = env_parse::<usize>("WIKITRENDS_CACHE_CAPACITY") {
            self.cache.capacity = v;
        }
        if let Some(v) = env_parse::<usize>("WIKITRENDS_RETRY_ATTEMPTS") {
            self.retry.max_attempts = v;
        }
        if let Some(v) = env_parse::<u64>("WIKITRENDS_RETRY_BASE_MS") {
            self.retry.base_delay_ms = v;
        }
        if let Ok(v) = env::var("WIKITRENDS_PAGEVIEWS_BASE") {
            self.http.pageviews_base_url = v;
        }
        if let Ok(v) = env::var("WIKITRENDS_METADATA_BASE") {
            self.http.metadata_base_url = v;
        }
        self.sanitize();
    }

    fn sanitize(&mut self) {
        self.cache.capacity = self.cache.capacity.max(1);
        self.retry.max_attempts = self.retry.max_attempts.max(1);
        if self.retry.max_delay_ms < self.retry.base_delay_ms {
            self.retry.max_delay_ms = self.retry.base_delay_ms;
        }
        // upstream hard limit for titles per query
        self.limits.metadata_batch_size = self.limits.metadata_batch_size.clamp(1, 50);
        self.limits.max_results = self.limits.max_results.max(1);
        self.relevance.category_batch_size = self.relevance.category_batch_size.max(1);
        self.relevance.max_results = self.relevance.max_results.max(1);
        let trim = |s: &mut String| {
            while s.ends_with('/') {
                s.pop();
            }
        };
        trim(&mut self.http.pageviews_base_url);
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults_elsewhere() {
        let s = Settings::from_toml_str(
            r#"
[cache]
ttl_secs = 60

[retry]
max_attempts = 0
base_delay_ms = 500
max_delay_ms = 100

[http]
pageviews_base_url = "http://localhost:9999/pv/"
"#,
        )
        .expect("parse");
        assert_eq!(s.cache.ttl(), Duration::from_secs(60));
        assert_eq!(s.cache.capacity, 100);
        assert_eq!(s.retry.max_attempts, 1);
        assert_eq!(s.retry.max_delay_ms, 500);
        assert_eq!(s.http.pageviews_base_url, "http://localhost:9999/pv");
        assert_eq!(s.trend.reliability_floor, 100);
        assert_eq!(s.limits.metadata_batch_size, 25);
    }

    #[test]
    fn shipped_config_parses() {
        let s = Settings::from_toml_str(include_str!("../../config/wikitrends.toml"))
            .expect("shipped config");
        assert_eq!(s.relevance.min_keyword_matches, 10);
        assert_eq!(s.limits.max_results, 50);
    }
}
