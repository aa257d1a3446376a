// src/metrics.rs
use anyhow::Context;
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use shuttle_axum::axum::{routing::get, Router};

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "sentiment_requests_total",
            "Sentiment calls sent to the provider."
        );
        describe_counter!(
            "sentiment_failures_total",
            "Sentiment calls that ended without a result (by reason)."
        );
        describe_counter!("derived_events_total", "Derived events emitted.");
        describe_counter!(
            "unknown_discarded_total",
            "Unknown classifications dropped by discard_unknown_events."
        );
        describe_counter!(
            "fragments_skipped_total",
            "Empty fragments skipped before classification."
        );
        describe_gauge!(
            "worker_last_receive_ts",
            "Unix ts of the last receive cycle."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Fails if a recorder is already set.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
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
