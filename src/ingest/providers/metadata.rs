//! MediaWiki action API: intro extract, thumbnail and categories for a batch of titles.

use std::collections::HashMap;

use reqwest::Url;
use serde::Deserialize;
use serde_json::Value;

use crate::fetch::FetchError;
use crate::ingest::types::{ArticleMetadata, Language};

pub const DESCRIPTION_MAX_CHARS: usize = 150;
pub const MAX_CATEGORIES: usize = 10;
const THUMB_SIZE: &str = "160";

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    query: Option<Query>,
    #[serde(default)]
    error: Option<ApiError>,
}
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    info: String,
}
#[derive(Debug, Default, Deserialize)]
struct Query {
    #[serde(default)]
    normalized: Vec<Mapping>,
    #[serde(default)]
    redirects: Vec<Mapping>,
    #[serde(default)]
    pages: Vec<Page>,
}
#[derive(Debug, Deserialize)]
struct Mapping {
    from: String,
    to: String,
}
#[derive(Debug, Deserialize)]
struct Page {
    title: String,
    #[serde(default)]
    missing: bool,
    #[serde(default)]
    extract: Option<String>,
    #[serde(default)]
    thumbnail: Option<Thumbnail>,
    #[serde(default)]
    categories: Vec<Category>,
}
#[derive(Debug, Deserialize)]
struct Thumbnail {
    source: String,
}
#[derive(Debug, Deserialize)]
struct Category {
    title: String,
}

/// Build the batched query URL. `base_template` may contain `{lang}`.
pub fn metadata_url(
    base_template: &str,
    lang: Language,
    titles: &[String],
) -> Result<String, FetchError> {
    let base = base_template.replace("{lang}", lang.code());
    let joined = titles.join("|");
    let params = [
        ("action", "query"),
        ("format", "json"),
        ("formatversion", "2"),
        ("prop", "extracts|pageimages|categories"),
        ("exintro", "1"),
        ("explaintext", "1"),
        ("exlimit", "max"),
        ("piprop", "thumbnail"),
        ("pithumbsize", THUMB_SIZE),
        ("pilimit", "max"),
        ("cllimit", "max"),
        ("clshow", "!hidden"),
        ("redirects", "1"),
        ("titles", joined.as_str()),
    ];
    Url::parse_with_params(&base, &params)
        .map(|u| u.to_string())
        .map_err(|e| FetchError::Transport {
            url: base.clone(),
            message: format!("invalid metadata base url: {e}"),
        })
}

/// Map each *requested* title to the metadata of the page it resolved to,
/// following the `normalized` and `redirects` hops the API reports.
pub fn parse_metadata(
    url: &str,
    payload: &Value,
    requested: &[String],
) -> Result<HashMap<String, ArticleMetadata>, FetchError> {
    let resp = QueryResponse::deserialize(payload).map_err(|e| FetchError::parse(url, e))?;
    if let Some(err) = resp.error {
        return Err(FetchError::parse(url, format!("api error {}: {}", err.code, err.info)));
    }
    let query = resp.query.unwrap_or_default();

    let normalized: HashMap<&str, &str> = query
        .normalized
        .iter()
        .map(|m| (m.from.as_str(), m.to.as_str()))
        .collect();
    let redirects: HashMap<&str, &str> = query
        .redirects
        .iter()
        .map(|m| (m.from.as_str(), m.to.as_str()))
        .collect();
    let pages: HashMap<&str, &Page> = query
        .pages
        .iter()
        .filter(|p| !p.missing)
        .map(|p| (p.title.as_str(), p))
        .collect();

    let mut out = HashMap::new();
    for title in requested {
        let mut resolved = title.as_str();
        if let Some(to) = normalized.get(resolved) {
            resolved = *to;
        }
        if let Some(to) = redirects.get(resolved) {
            resolved = *to;
        }
        if let Some(page) = pages.get(resolved) {
            out.insert(title.clone(), page_metadata(page));
        }
    }
    Ok(out)
}

fn page_metadata(page: &Page) -> ArticleMetadata {
    let extract = page
        .extract
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    ArticleMetadata {
        description: extract.as_deref().map(describe),
        thumbnail: page.thumbnail.as_ref().map(|t| t.source.clone()),
        categories: page
            .categories
            .iter()
            .take(MAX_CATEGORIES)
            .map(|c| strip_namespace(&c.title).to_string())
            .collect(),
        extract,
    }
}

/// `Kategorie:Person (Zürich)` → `Person (Zürich)`.
fn strip_namespace(title: &str) -> &str {
    title.split_once(':').map(|(_, rest)| rest).unwrap_or(title)
}

/// Short single-line description from an extract, at most 150 chars.
pub fn describe(extract: &str) -> String {
    let decoded = html_escape::decode_html_entities(extract);
    let flat = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= DESCRIPTION_MAX_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(DESCRIPTION_MAX_CHARS - 3).collect();
    format!("{}...", cut.trim_end())
}
