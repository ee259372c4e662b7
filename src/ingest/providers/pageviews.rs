//! Wikimedia pageviews REST API: daily top lists and per-article daily series.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::fetch::{FetchError, ResilientFetcher};
use crate::ingest::encode_title;
use crate::ingest::types::{Article, Language, ViewPoint};

const ACCESS: &str = "all-access";
const AGENT: &str = "user";

#[derive(Debug, Deserialize)]
struct TopResponse {
    #[serde(default)]
    items: Vec<TopItem>,
}
#[derive(Debug, Deserialize)]
struct TopItem {
    #[serde(default)]
    articles: Vec<TopArticle>,
}
#[derive(Debug, Deserialize)]
struct TopArticle {
    article: String,
    views: u64,
    #[serde(default)]
    rank: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SeriesResponse {
    #[serde(default)]
    items: Vec<SeriesItem>,
}
#[derive(Debug, Deserialize)]
struct SeriesItem {
    timestamp: String,
    views: u64,
}

pub fn top_url(base: &str, lang: Language, date: NaiveDate) -> String {
    format!(
        "{base}/top/{}/{ACCESS}/{}",
        lang.project(),
        date.format("%Y/%m/%d")
    )
}

pub fn per_article_url(
    base: &str,
    lang: Language,
    identifier: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    format!(
        "{base}/per-article/{}/{ACCESS}/{AGENT}/{}/daily/{}/{}",
        lang.project(),
        encode_title(identifier),
        start.format("%Y%m%d"),
        end.format("%Y%m%d")
    )
}

/// Decode a top-list payload into a snapshot. Upstream order is kept; a repeated
/// identifier keeps its first (best-ranked) occurrence.
pub fn parse_top_snapshot(url: &str, payload: &Value) -> Result<Vec<Article>, FetchError> {
    let resp = TopResponse::deserialize(payload).map_err(|e| FetchError::parse(url, e))?;
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in resp.items {
        for a in item.articles {
            if !seen.insert(a.article.clone()) {
                continue;
            }
            let mut article = Article::new(a.article, a.views);
            article.rank = a.rank;
            out.push(article);
        }
    }
    Ok(out)
}

/// Decode a per-article series. Timestamps look like `YYYYMMDD00`.
pub fn parse_view_history(url: &str, payload: &Value) -> Result<Vec<ViewPoint>, FetchError> {
    let resp = SeriesResponse::deserialize(payload).map_err(|e| FetchError::parse(url, e))?;
    let mut out = resp
        .items
        .into_iter()
        .map(|it| {
            let day = it.timestamp.get(..8).unwrap_or(&it.timestamp);
            NaiveDate::parse_from_str(day, "%Y%m%d")
                .map(|date| ViewPoint {
                    date,
                    views: it.views,
                })
                .map_err(|e| FetchError::parse(url, format!("timestamp {}: {e}", it.timestamp)))
        })
        .collect::<Result<Vec<_>, _>>()?;
    out.sort_by_key(|p| p.date);
    Ok(out)
}

/// Typed access to the pageviews API through the shared fetcher.
#[derive(Clone)]
pub struct PageviewsProvider {
    fetcher: ResilientFetcher,
    base_url: String,
}

impl PageviewsProvider {
    pub fn new(fetcher: ResilientFetcher, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    pub async fn top_snapshot(
        &self,
        lang: Language,
        date: NaiveDate,
    ) -> Result<Vec<Article>, FetchError> {
        let url = top_url(&self.base_url, lang, date);
        self.fetcher.fetch_parsed(&url, parse_top_snapshot).await
    }

    pub async fn view_history(
        &self,
        lang: Language,
        identifier: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ViewPoint>, FetchError> {
        let url = per_article_url(&self.base_url, lang, identifier, start, end);
        self.fetcher.fetch_parsed(&url, parse_view_history).await
    }
}
