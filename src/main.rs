//! Movie Ranklist Service: binary entrypoint.
//! Boots the Axum HTTP server: config, rating service, metrics and routes.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use movie_ranklist::metrics::Metrics;
use movie_ranklist::{router, RanklistConfig, RatingService};

/// Compact tracing logs; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=warn"));

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

    init_tracing();

    let config = RanklistConfig::load_default().context("load ranklist config")?;

    // Recorder first, so metric descriptions land in the exporter.
    let metrics = Metrics::init(config.cache_ttl_secs)?;
    let service = RatingService::from_config(&config).context("build rating service")?;

    info!(
        max_concurrency = config.max_concurrency,
        cache_ttl_secs = config.cache_ttl_secs,
        "movie ranklist ready"
    );

    let app = router(service).merge(metrics.router());
    Ok(app.into())
}
