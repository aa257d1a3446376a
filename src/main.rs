//! Sentiment worker — Binary Entrypoint
//! Boots the Axum HTTP server: receive/liveness/options routes plus /metrics.

use std::sync::Arc;

use anyhow::Context;
use sentiment_worker::{
    api::{self, AppState},
    client::AlchemyHttpService,
    config::load_options_default,
    credentials::{CredentialStore, EnvCredentials},
    emit::MemorySink,
    metrics::Metrics,
    Worker,
};
use shuttle_axum::ShuttleAxum;
use shuttle_runtime::SecretStore;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Secret store first, process environment second.
struct SecretCredentials {
    secrets: SecretStore,
}

impl CredentialStore for SecretCredentials {
    fn credential(&self, name: &str) -> Option<String> {
        self.secrets
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| EnvCredentials.credential(name))
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("sentiment_worker=info,warn"));

    // Shuttle may already have installed a subscriber; keep theirs then.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn main(#[shuttle_runtime::Secrets] secrets: SecretStore) -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let options = load_options_default()?;
    let credentials = Arc::new(SecretCredentials { secrets });
    let service = Arc::new(AlchemyHttpService::from_env()?);
    let sink = Arc::new(MemorySink::new());

    let worker = Worker::new(&options, service, credentials, sink.clone())
        .context("invalid worker options")?;
    tracing::info!(
        content = %worker.config().content_path,
        period_days = worker.config().expected_receive_period_days,
        discard_unknown = worker.config().discard_unknown.enabled(),
        "worker configured"
    );

    let metrics = Metrics::init()?;
    let router = api::router(AppState::new(worker, sink)).merge(metrics.router());

    Ok(router.into())
}
