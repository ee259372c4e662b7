//! wikitrends: Binary Entrypoint
//! Boots the Axum HTTP server over the pageview pipeline.
//!
//! See `README.md` for quickstart and `DESIGN.md` for architecture notes.

use shuttle_axum::ShuttleAxum;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use wikitrends::metrics::Metrics;
use wikitrends::Settings;

const DEFAULT_LOG_FILTER: &str =
    "wikitrends=info,engine=info,relevance=info,enrich=info,fetch=info,warn";

/// Compact logs by default; JSON lines when `WIKITRENDS_LOG_JSON=1`.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let json = std::env::var("WIKITRENDS_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    // the platform may have installed a subscriber already; keep it then
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let settings = Settings::load()?;
    info!(
        cache_capacity = settings.cache.capacity,
        cache_ttl_secs = settings.cache.ttl_secs,
        retry_attempts = settings.retry.max_attempts,
        "settings loaded"
    );

    let mut router = wikitrends::app(&settings)?;

    if std::env::var("WIKITRENDS_METRICS").ok().is_some_and(|v| v == "1") {
        match Metrics::init(&settings) {
            Ok(m) => router = router.merge(m.router()),
            Err(e) => warn!(error = %e, "metrics disabled"),
        }
    }

    Ok(router.into())
}
