use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ranklist_cache_hits_total", "Lookups served from the TTL cache.");
        describe_counter!(
            "ranklist_cache_misses_total",
            "Lookups not in the cache (absent or expired)."
        );
        describe_counter!(
            "ranklist_provider_errors_total",
            "Provider fetch/parse errors, including rate limits."
        );
        describe_counter!(
            "ranklist_batch_queries_total",
            "Queries received by batch searches."
        );
        describe_counter!(
            "ranklist_worker_failures_total",
            "Batch tasks that panicked, by stage (search, enrich)."
        );
        describe_histogram!(
            "ranklist_batch_duration_ms",
            "Wall time of one batch search in milliseconds."
        );
        describe_gauge!("ranklist_cache_ttl_secs", "Configured cache TTL in seconds.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and publish the cache TTL as a gauge.
    /// Fails if a global recorder is already installed.
    pub fn init(cache_ttl_secs: u64) -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        ensure_metrics_described();
        gauge!("ranklist_cache_ttl_secs").set(cache_ttl_secs as f64);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
