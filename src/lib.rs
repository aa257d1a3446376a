// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod activity;
pub mod api;
pub mod client;
pub mod config;
pub mod credentials;
pub mod emit;
pub mod extract;
pub mod metrics;
pub mod normalize;
pub mod types;
pub mod worker;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::client::{AlchemyHttpService, SentimentClient, SentimentService};
pub use crate::config::{ConfigError, WorkerConfig, WorkerOptions};
pub use crate::emit::{ChannelSink, EventEmitter, EventSink, MemorySink};
pub use crate::types::{ClassificationRecord, DerivedEvent, IncomingEvent, RawResult};
pub use crate::worker::{ReceiveReport, Worker};
