// src/config/mod.rs
pub mod worker;

pub use worker::{
    load_options_default, load_options_from, ConfigError, DiscardUnknown, WorkerConfig,
    WorkerOptions,
};
