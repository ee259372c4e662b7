// src/api.rs
//! JSON boundary for the display layer. Handlers parse query parameters, call the
//! engine, and serialize whatever it returns; they never see upstream errors.

use std::sync::Arc;

use serde::Deserialize;
use shuttle_axum::axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;
use tracing::debug;

use crate::engine::TrendEngine;
use crate::ingest::types::{Language, Period};

pub const DEFAULT_HISTORY_DAYS: u32 = 30;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<TrendEngine>,
}

impl AppState {
    pub fn new(engine: TrendEngine) -> Self {
        Self {
            engine: Arc::new(engine),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/top", get(top))
        .route("/trending", get(trending))
        .route("/history", get(history))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    period: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    swiss: bool,
}

/// Query flag: `true`/`false`, `1`/`0`, `yes`/`no`; empty means false.
fn flag<'de, D>(de: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(de)?;
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(serde::de::Error::custom(format!("invalid swiss flag: {other}"))),
    }
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    article: String,
    #[serde(default)]
    lang: Option<String>,
    #[serde(default)]
    days: Option<u32>,
}

fn bad_request(msg: impl std::fmt::Display) -> Response {
    (StatusCode::BAD_REQUEST, msg.to_string()).into_response()
}

fn parse_lang(raw: Option<&str>) -> Result<Language, Response> {
    raw.unwrap_or("de").parse().map_err(bad_request)
}

fn parse_period(raw: Option<&str>) -> Result<Period, Response> {
    raw.unwrap_or("daily").parse().map_err(bad_request)
}

async fn top(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Response {
    let (lang, period) = match (parse_lang(q.lang.as_deref()), parse_period(q.period.as_deref())) {
        (Ok(l), Ok(p)) => (l, p),
        (Err(r), _) | (_, Err(r)) => return r,
    };
    debug!(target: "api", %lang, ?period, swiss = q.swiss, "GET /top");
    Json(state.engine.top_articles(lang, period, q.swiss).await).into_response()
}

async fn trending(State(state): State<AppState>, Query(q): Query<ListQuery>) -> Response {
    let (lang, period) = match (parse_lang(q.lang.as_deref()), parse_period(q.period.as_deref())) {
        (Ok(l), Ok(p)) => (l, p),
        (Err(r), _) | (_, Err(r)) => return r,
    };
    debug!(target: "api", %lang, ?period, swiss = q.swiss, "GET /trending");
    Json(state.engine.trending_articles(lang, period, q.swiss).await).into_response()
}

async fn history(State(state): State<AppState>, Query(q): Query<HistoryQuery>) -> Response {
    let lang = match parse_lang(q.lang.as_deref()) {
        Ok(l) => l,
        Err(r) => return r,
    };
    if q.article.trim().is_empty() {
        return bad_request("missing article");
    }
    let days = q.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    debug!(target: "api", %lang, article = %q.article, days, "GET /history");
    Json(state.engine.article_view_history(&q.article, lang, days).await).into_response()
}
