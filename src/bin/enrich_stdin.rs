//! Runs one receive cycle over JSON-lines events from stdin and prints the
//! derived events as JSON lines on stdout.
//!
//! Each input line is an event payload, e.g. `{"text": "Markets rallied."}`.
//! Options come from the usual locations (`$WORKER_OPTIONS_PATH`,
//! `config/worker.toml`, `config/worker.json`); the key may come from
//! `ALCHEMY_API_KEY`.

use std::io::{self, BufRead};
use std::sync::Arc;

use anyhow::{Context, Result};
use sentiment_worker::{
    client::AlchemyHttpService, config::load_options_default, credentials::EnvCredentials,
    ChannelSink, IncomingEvent, Worker,
};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let mut events = Vec::new();
    for (n, line) in io::stdin().lock().lines().enumerate() {
        let line = line.context("read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let payload = serde_json::from_str(&line)
            .with_context(|| format!("line {}: not JSON", n + 1))?;
        events.push(IncomingEvent::new(payload));
    }

    let options = load_options_default()?;
    let (sink, mut rx) = ChannelSink::new();
    let mut worker = Worker::new(
        &options,
        Arc::new(AlchemyHttpService::from_env()?),
        Arc::new(EnvCredentials),
        Arc::new(sink),
    )
    .context("invalid worker options")?;

    let report = worker.receive(&events).await;
    drop(worker);

    while let Some(ev) = rx.recv().await {
        println!("{}", serde_json::to_string(&ev)?);
    }
    tracing::info!(?report, "done");
    Ok(())
}
