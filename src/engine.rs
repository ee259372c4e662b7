//! # Pipeline Orchestrator
//! Public operations consumed by the display layer. Composes fetch → page filter →
//! relevance → enrichment → trends, applies result caps, and turns every
//! unrecoverable failure into an empty list.
//!
//! Empty output therefore means "no data, possibly a transient upstream failure",
//! not "zero articles exist". A partial list is likewise indistinguishable from a
//! genuinely quiet day.

use std::sync::Arc;
use std::time::Instant;

use chrono::{Days, NaiveDate, Utc};
use tracing::{info, warn};

use crate::cache::ResponseCache;
use crate::config::Settings;
use crate::enrich::{Enrich, MetadataEnricher};
use crate::fetch::{FetchError, HttpTransport, ResilientFetcher, RetryPolicy, Transport};
use crate::ingest::filter::filter_unwanted;
use crate::ingest::providers::pageviews::PageviewsProvider;
use crate::ingest::types::{Article, Language, Period, ViewPoint};
use crate::relevance::{RelevanceFilter, SwissVocabulary};
use crate::trend::TrendCalculator;

pub struct TrendEngine {
    pageviews: PageviewsProvider,
    enricher: MetadataEnricher,
    relevance: RelevanceFilter,
    trends: TrendCalculator,
    cache: Arc<ResponseCache>,
    max_results: usize,
    max_history_days: u32,
    /// Fixed "today" for deterministic runs; wall clock (UTC) otherwise.
    today: Option<NaiveDate>,
}

impl TrendEngine {
    /// Production wiring: reqwest transport, vocabulary from file or embedded.
    pub fn build(settings: &Settings) -> anyhow::Result<Self> {
        let transport: Arc<dyn Transport> = Arc::new(HttpTransport::new(&settings.http)?);
        let vocab = SwissVocabulary::load(settings.relevance.vocabulary_path.as_deref())?;
        Ok(Self::with_transport(settings, transport, vocab))
    }

    /// Wiring over an arbitrary transport, with a fresh cache.
    pub fn with_transport(
        settings: &Settings,
        transport: Arc<dyn Transport>,
        vocab: SwissVocabulary,
    ) -> Self {
        let cache = Arc::new(ResponseCache::with_capacity(settings.cache.capacity));
        let fetcher = ResilientFetcher::new(
            transport,
            cache.clone(),
            settings.cache.ttl(),
            RetryPolicy::from_settings(&settings.retry),
        );
        let enricher = MetadataEnricher::new(
            fetcher.clone(),
            settings.http.metadata_base_url.clone(),
            settings.limits.metadata_batch_size,
        );
        let relevance = RelevanceFilter::new(
            vocab,
            Arc::new(enricher.clone()) as Arc<dyn Enrich>,
            &settings.relevance,
        );
        Self {
            pageviews: PageviewsProvider::new(fetcher, settings.http.pageviews_base_url.clone()),
            enricher,
            relevance,
            trends: TrendCalculator::from_settings(&settings.trend),
            cache,
            max_results: settings.limits.max_results,
            max_history_days: settings.limits.max_history_days.max(1),
            today: None,
        }
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Upstream only publishes fully elapsed days.
    pub fn latest_complete_day(&self) -> NaiveDate {
        self.today() - Days::new(1)
    }

    pub fn comparison_day(&self, period: Period) -> NaiveDate {
        self.today() - Days::new(period.comparison_offset_days().unsigned_abs())
    }

    /// Up to `max_results` most viewed articles of the latest complete day.
    pub async fn top_articles(
        &self,
        lang: Language,
        period: Period,
        swiss_only: bool,
    ) -> Vec<Article> {
        let t0 = Instant::now();
        match self.try_top_articles(lang, swiss_only).await {
            Ok(v) => {
                info!(
                    target: "engine", %lang, ?period, swiss_only, count = v.len(),
                    ms = t0.elapsed().as_millis() as u64, "top articles"
                );
                v
            }
            Err(e) => {
                warn!(
                    target: "engine", %lang, ?period, swiss_only, error = %e,
                    "top articles unavailable"
                );
                Vec::new()
            }
        }
    }

    /// Up to `max_results` growing articles versus the period's comparison day.
    pub async fn trending_articles(
        &self,
        lang: Language,
        period: Period,
        swiss_only: bool,
    ) -> Vec<Article> {
        let t0 = Instant::now();
        match self.try_trending_articles(lang, period, swiss_only).await {
            Ok(v) => {
                info!(
                    target: "engine", %lang, ?period, swiss_only, count = v.len(),
                    ms = t0.elapsed().as_millis() as u64, "trending articles"
                );
                v
            }
            Err(e) => {
                warn!(
                    target: "engine", %lang, ?period, swiss_only, error = %e,
                    "trending articles unavailable"
                );
                Vec::new()
            }
        }
    }

    /// Daily views for the `days` days ending with the latest complete day.
    pub async fn article_view_history(
        &self,
        identifier: &str,
        lang: Language,
        days: u32,
    ) -> Vec<ViewPoint> {
        let days = days.clamp(1, self.max_history_days);
        let end = self.latest_complete_day();
        let start = end - Days::new(u64::from(days - 1));
        match self.pageviews.view_history(lang, identifier, start, end).await {
            Ok(points) => points,
            Err(e) => {
                warn!(
                    target: "engine", %lang, identifier, days, error = %e,
                    "view history unavailable"
                );
                Vec::new()
            }
        }
    }

    async fn try_top_articles(
        &self,
        lang: Language,
        swiss_only: bool,
    ) -> Result<Vec<Article>, FetchError> {
        let raw = self.pageviews.top_snapshot(lang, self.latest_complete_day()).await?;
        let mut articles = filter_unwanted(&raw);
        if swiss_only {
            articles = self.relevance.filter_relevant(&articles, lang).await;
        }
        // enrichment keeps order and length, so capping first only saves upstream calls
        articles.truncate(self.max_results);
        if !articles.is_empty() {
            articles = self.enricher.enrich(&articles, lang).await;
        }
        Ok(articles)
    }

    async fn try_trending_articles(
        &self,
        lang: Language,
        period: Period,
        swiss_only: bool,
    ) -> Result<Vec<Article>, FetchError> {
        // baseline is never Swiss-filtered; the filter runs on the trend output
        let current = self.try_top_articles(lang, false).await?;
        let previous_raw = self
            .pageviews
            .top_snapshot(lang, self.comparison_day(period))
            .await?;
        let previous = filter_unwanted(&previous_raw);

        let mut trending = self.trends.compute_trends(&current, &previous);
        if swiss_only {
            trending = self.relevance.filter_relevant(&trending, lang).await;
        }
        trending.truncate(self.max_results);
        Ok(trending)
    }
}
