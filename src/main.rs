//! Premier League transfers binary entrypoint.
//! Builds the snapshot store, starts the refresh scheduler, and serves the read API.

use std::sync::Arc;
use std::time::Duration;

use pl_transfers::api::{self, AppState};
use pl_transfers::config::AggregatorConfig;
use pl_transfers::ingest::providers::{build_fetchers, build_http_client};
use pl_transfers::telemetry::Metrics;
use pl_transfers::{spawn_scheduler, Aggregator, SnapshotStore};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - TRANSFERS_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("TRANSFERS_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ingest=info,warn"));

    // Shuttle may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let cfg = AggregatorConfig::load_default()?;
    let client = build_http_client(&cfg)?;
    let fetchers = build_fetchers(&cfg, &client);
    tracing::info!(
        sources = fetchers.len(),
        interval_secs = cfg.refresh_interval_secs,
        search_credential = cfg.search.bearer_token.is_some(),
        "aggregator configured"
    );

    let store = SnapshotStore::new();
    let aggregator = Arc::new(Aggregator::new(
        fetchers,
        store.clone(),
        Duration::from_secs(cfg.fetch_timeout_secs),
    ));
    let scheduler = spawn_scheduler(
        aggregator,
        Duration::from_secs(cfg.refresh_interval_secs),
    );

    let state = AppState::new(store, Some(scheduler.trigger()));
    let mut router = api::router(state);

    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "prometheus recorder not installed"),
    }

    Ok(router.into())
}
