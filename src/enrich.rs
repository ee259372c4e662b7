//! Metadata enrichment: attaches description, thumbnail, categories and extract
//! to articles, one upstream call per batch of titles.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::fetch::{FetchError, ResilientFetcher};
use crate::ingest::providers::metadata::{metadata_url, parse_metadata};
use crate::ingest::types::{Article, Language};

pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Strict enrichment seam used by the relevance filter's category stage.
#[async_trait]
pub trait Enrich: Send + Sync {
    /// Fails on the first batch that cannot be fetched.
    async fn try_enrich(
        &self,
        articles: &[Article],
        lang: Language,
    ) -> Result<Vec<Article>, FetchError>;
}

#[derive(Clone)]
pub struct MetadataEnricher {
    fetcher: ResilientFetcher,
    base_url: String,
    batch_size: usize,
}

impl MetadataEnricher {
    pub fn new(fetcher: ResilientFetcher, base_url: impl Into<String>, batch_size: usize) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            batch_size: batch_size.max(1),
        }
    }

    /// Best effort: a batch that fails comes back unchanged, the call never fails.
    pub async fn enrich(&self, articles: &[Article], lang: Language) -> Vec<Article> {
        let mut out = Vec::with_capacity(articles.len());
        for batch in articles.chunks(self.batch_size) {
            match self.enrich_batch(batch, lang).await {
                Ok(enriched) => out.extend(enriched),
                Err(e) => {
                    warn!(
                        target: "enrich",
                        %lang, batch = batch.len(), error = %e,
                        "metadata batch failed; keeping articles as-is"
                    );
                    out.extend_from_slice(batch);
                }
            }
        }
        out
    }

    async fn enrich_batch(
        &self,
        batch: &[Article],
        lang: Language,
    ) -> Result<Vec<Article>, FetchError> {
        let titles: Vec<String> = batch.iter().map(Article::title).collect();
        let url = metadata_url(&self.base_url, lang, &titles)?;
        let found = self
            .fetcher
            .fetch_parsed(&url, |u, payload| parse_metadata(u, payload, &titles))
            .await?;
        debug!(
            target: "enrich",
            %lang, requested = titles.len(), found = found.len(), "metadata batch"
        );

        Ok(batch
            .iter()
            .zip(titles.iter())
            .map(|(article, title)| match found.get(title) {
                Some(meta) => article.with_metadata(meta.clone()),
                None => article.clone(),
            })
            .collect())
    }
}

#[async_trait]
impl Enrich for MetadataEnricher {
    async fn try_enrich(
        &self,
        articles: &[Article],
        lang: Language,
    ) -> Result<Vec<Article>, FetchError> {
        let mut out = Vec::with_capacity(articles.len());
        for batch in articles.chunks(self.batch_size) {
            out.extend(self.enrich_batch(batch, lang).await?);
        }
        Ok(out)
    }
}
