// src/api.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use shuttle_axum::axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::config::WorkerOptions;
use crate::emit::MemorySink;
use crate::types::{DerivedEvent, IncomingEvent};
use crate::worker::{ReceiveReport, Worker};

/// Shared handler state. The mutex keeps receive cycles from interleaving.
#[derive(Clone)]
pub struct AppState {
    worker: Arc<Mutex<Worker>>,
    sink: Arc<MemorySink>,
}

impl AppState {
    /// `sink` must be the sink `worker` emits into.
    pub fn new(worker: Worker, sink: Arc<MemorySink>) -> Self {
        Self {
            worker: Arc::new(Mutex::new(worker)),
            sink,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/receive", post(receive))
        .route("/api/working", get(working))
        .route("/api/options", put(update_options))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Accepts `{ "payload": {...}, "received_at": ... }` or a bare payload. An
/// object with any other member next to `payload` is a bare payload.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum EventIn {
    Wrapped(IncomingEvent),
    Bare(Value),
}

impl From<EventIn> for IncomingEvent {
    fn from(ev: EventIn) -> Self {
        match ev {
            EventIn::Wrapped(ev) => ev,
            EventIn::Bare(payload) => IncomingEvent::new(payload),
        }
    }
}

#[derive(serde::Serialize)]
struct ReceiveResp {
    report: ReceiveReport,
    events: Vec<DerivedEvent>,
}

async fn receive(State(state): State<AppState>, Json(items): Json<Vec<EventIn>>) -> Json<ReceiveResp> {
    let events: Vec<IncomingEvent> = items.into_iter().map(IncomingEvent::from).collect();

    let mut worker = state.worker.lock().await;
    let report = worker.receive(&events).await;
    // still under the worker lock, so only this cycle's events are in the sink
    let emitted = state.sink.drain();

    Json(ReceiveResp {
        report,
        events: emitted,
    })
}

#[derive(serde::Serialize)]
struct WorkingResp {
    working: bool,
    last_receive_at: Option<DateTime<Utc>>,
    last_event_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
}

async fn working(State(state): State<AppState>) -> Json<WorkingResp> {
    let worker = state.worker.lock().await;
    let activity = worker.activity();
    Json(WorkingResp {
        working: worker.is_working(),
        last_receive_at: activity.last_receive_at,
        last_event_at: activity.last_event_at,
        last_error: activity.last_error().map(|e| e.message.clone()),
    })
}

async fn update_options(
    State(state): State<AppState>,
    Json(options): Json<WorkerOptions>,
) -> (StatusCode, Json<Value>) {
    let mut worker = state.worker.lock().await;
    match worker.update_options(&options) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "updated": true }))),
        Err(e) => {
            tracing::warn!(error = %e, "rejected worker options");
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(serde_json::json!({ "updated": false, "error": e.to_string() })),
            )
        }
    }
}
