// src/relevance.rs
//! Swiss-only relevance filter: cheap keyword stage on titles, then (only when that
//! under-matches) a category stage backed by the metadata enricher.

use metrics::counter;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::RelevanceSettings;
use crate::enrich::Enrich;
use crate::ingest::match_key;
use crate::ingest::types::{Article, Language};

pub const DEFAULT_RELEVANCE_CONFIG_PATH: &str = "config/relevance.toml";
pub const ENV_RELEVANCE_CONFIG_PATH: &str = "WIKITRENDS_RELEVANCE_PATH";

/// Shipped vocabulary, used when no file is configured or present.
pub const EMBEDDED_VOCABULARY: &str = include_str!("../config/relevance.toml");

/* ----------------------------
Vocabulary schema (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct VocabularyRoot {
    pub keywords: KeywordsCfg,
    pub categories: CategoriesCfg,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KeywordsCfg {
    #[serde(default)]
    pub places: Vec<String>,
    #[serde(default)]
    pub demonyms: Vec<String>,
    #[serde(default)]
    pub institutions: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoriesCfg {
    #[serde(default)]
    pub core: Vec<String>,
}

/// Lowercased, de-duplicated term lists.
#[derive(Debug, Clone)]
pub struct SwissVocabulary {
    keywords: Vec<String>,
    core: Vec<String>,
}

impl SwissVocabulary {
    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let root: VocabularyRoot = toml::from_str(toml_str)?;
        let keywords = normalize_terms(
            root.keywords
                .places
                .into_iter()
                .chain(root.keywords.demonyms)
                .chain(root.keywords.institutions),
        );
        let core = normalize_terms(root.categories.core);
        if keywords.is_empty() || core.is_empty() {
            anyhow::bail!("relevance vocabulary needs at least one keyword and one core term");
        }
        Ok(Self { keywords, core })
    }

    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read relevance vocabulary at {}: {}", path.display(), e)
        })?;
        Self::from_toml_str(&content)
    }

    pub fn embedded() -> anyhow::Result<Self> {
        Self::from_toml_str(EMBEDDED_VOCABULARY)
    }

    /// Resolution order: explicit path, `WIKITRENDS_RELEVANCE_PATH`, the default file,
    /// then the embedded copy.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(p) = explicit {
            return Self::from_path(p);
        }
        if let Ok(p) = std::env::var(ENV_RELEVANCE_CONFIG_PATH) {
            return Self::from_path(&PathBuf::from(p));
        }
        let default = PathBuf::from(DEFAULT_RELEVANCE_CONFIG_PATH);
        if default.exists() {
            return Self::from_path(&default);
        }
        Self::embedded()
    }

    pub fn from_terms<I, J, S, T>(keywords: I, core: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            keywords: normalize_terms(keywords.into_iter().map(Into::into)),
            core: normalize_terms(core.into_iter().map(Into::into)),
        }
    }

    /// First keyword contained in the (lowercased, decoded) title.
    pub fn keyword_hit(&self, title_lower: &str) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| title_lower.contains(k.as_str()))
            .map(String::as_str)
    }

    /// First core term contained in any category name.
    pub fn category_hit(&self, categories: &[String]) -> Option<&str> {
        categories.iter().find_map(|c| {
            let c = c.to_lowercase();
            self.core
                .iter()
                .find(|t| c.contains(t.as_str()))
                .map(String::as_str)
        })
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }
}

fn normalize_terms(terms: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    terms
        .into_iter()
        .map(|t| t.to_lowercase())
        .filter(|t| !t.trim().is_empty())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

/* ----------------------------
Two-stage filter
---------------------------- */

pub struct RelevanceFilter {
    vocab: SwissVocabulary,
    enricher: Arc<dyn Enrich>,
    min_keyword_matches: usize,
    batch_size: usize,
    max_results: usize,
}

impl RelevanceFilter {
    pub fn new(vocab: SwissVocabulary, enricher: Arc<dyn Enrich>, cfg: &RelevanceSettings) -> Self {
        Self {
            vocab,
            enricher,
            min_keyword_matches: cfg.min_keyword_matches,
            batch_size: cfg.category_batch_size.max(1),
            max_results: cfg.max_results.max(1),
        }
    }

    /// Stage 1 only: indices of articles whose title contains a keyword.
    pub fn keyword_matches(&self, articles: &[Article]) -> Vec<usize> {
        articles
            .iter()
            .enumerate()
            .filter(|(_, a)| self.vocab.keyword_hit(&match_key(&a.identifier)).is_some())
            .map(|(i, _)| i)
            .collect()
    }

    /// Subset of `articles` related to Switzerland, in input order.
    ///
    /// Enough keyword hits return exactly the keyword set. Otherwise the rest is
    /// enriched in batches and matched on categories until `max_results` is reached.
    /// A failing category stage yields the keyword set.
    pub async fn filter_relevant(&self, articles: &[Article], lang: Language) -> Vec<Article> {
        let stage1 = self.keyword_matches(articles);
        let stage1_articles: Vec<Article> = stage1.iter().map(|&i| articles[i].clone()).collect();

        if stage1.len() >= self.min_keyword_matches {
            info!(target: "relevance", %lang, stage1 = stage1.len(), "keyword stage sufficient");
            return stage1_articles;
        }

        let mut selected: HashMap<usize, Article> = stage1
            .iter()
            .map(|&i| (i, articles[i].clone()))
            .collect();
        let remaining: Vec<usize> = (0..articles.len())
            .filter(|i| !selected.contains_key(i))
            .collect();

        counter!("wikitrends_relevance_stage2_total").increment(1);
        let mut stage2_hits = 0usize;

        'batches: for chunk in remaining.chunks(self.batch_size) {
            if selected.len() >= self.max_results {
                break;
            }
            let batch: Vec<Article> = chunk.iter().map(|&i| articles[i].clone()).collect();
            let enriched = match self.enricher.try_enrich(&batch, lang).await {
                Ok(v) => v,
                Err(e) => {
                    warn!(
                        target: "relevance",
                        %lang, stage1 = stage1_articles.len(), error = %e,
                        "category stage failed; falling back to keyword matches"
                    );
                    return stage1_articles;
                }
            };
            let by_id: HashMap<&str, &Article> =
                enriched.iter().map(|a| (a.identifier.as_str(), a)).collect();

            for &idx in chunk {
                let Some(enriched) = by_id.get(articles[idx].identifier.as_str()) else {
                    continue;
                };
                let hit = enriched
                    .metadata
                    .as_ref()
                    .and_then(|m| self.vocab.category_hit(&m.categories))
                    .is_some();
                if hit {
                    selected.insert(idx, (*enriched).clone());
                    stage2_hits += 1;
                    if selected.len() >= self.max_results {
                        break 'batches;
                    }
                }
            }
        }

        info!(
            target: "relevance",
            %lang, stage1 = stage1.len(), stage2 = stage2_hits, "category stage finished"
        );

        let mut order: Vec<usize> = selected.keys().copied().collect();
        order.sort_unstable();
        order
            .into_iter()
            .take(self.max_results)
            .filter_map(|i| selected.remove(&i))
            .collect()
    }
}

/* ----------------------------
Tests
---------------------------- */

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_vocabulary_parses() {
        let v = SwissVocabulary::embedded().expect("embedded vocabulary");
        assert!(v.keyword_count() > 50);
        assert_eq!(v.keyword_hit("fc basel"), Some("basel"));
        assert!(v.keyword_hit("taylor swift").is_none());
    }

    #[test]
    fn keyword_hit_is_substring_on_lowercase() {
        let v = SwissVocabulary::from_terms(["Zürich", "Genève"], ["schweiz"]);
        assert!(v.keyword_hit("flughafen zürich").is_some());
        assert!(v.keyword_hit("lac de genève").is_some());
        assert!(v.keyword_hit("lake geneva").is_none());
    }

    #[test]
    fn category_hit_ignores_case() {
        let v = SwissVocabulary::from_terms(["x"], ["schweiz", "swiss"]);
        assert_eq!(
            v.category_hit(&["Person (Zürich)".into(), "Politiker (Schweiz)".into()]),
            Some("schweiz")
        );
        assert_eq!(v.category_hit(&["Swiss musicians".into()]), Some("swiss"));
        assert!(v.category_hit(&["Austrian skiers".into()]).is_none());
    }

    #[test]
    fn empty_vocabulary_is_rejected() {
        let err = SwissVocabulary::from_toml_str("[keywords]\n[categories]\ncore = []\n");
        assert!(err.is_err());
    }
}
