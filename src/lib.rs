// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod cache;
pub mod config;
pub mod engine;
pub mod enrich;
pub mod fetch;
pub mod ingest;
pub mod metrics;
pub mod relevance;
pub mod trend;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::Settings;
pub use crate::engine::TrendEngine;
pub use crate::fetch::FetchError;
pub use crate::ingest::types::{
    Article, ArticleMetadata, Language, Period, ReliabilityTier, ViewPoint,
};

/// Router with the engine built from `settings` over the live upstream APIs.
pub fn app(settings: &Settings) -> anyhow::Result<shuttle_axum::axum::Router> {
    let engine = TrendEngine::build(settings)?;
    Ok(router(AppState::new(engine)))
}
