// src/worker.rs
//! # Worker
//! Drives extraction -> classification -> normalization -> emission for each
//! received batch, strictly in order, one provider call at a time.
//!
//! A fragment that fails to classify still produces its derived event (or
//! its discard); nothing stops the rest of the batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge};
use serde::Serialize;

use crate::activity::ActivityLog;
use crate::client::{Classification, SentimentClient, SentimentService};
use crate::config::{ConfigError, WorkerConfig, WorkerOptions};
use crate::credentials::CredentialStore;
use crate::emit::{DiscardObserver, Emission, EventEmitter, EventSink};
use crate::extract::{FieldExtractor, JsonPathExtractor};
use crate::metrics::ensure_metrics_described;
use crate::normalize::normalize;
use crate::types::IncomingEvent;

/// Per-cycle tallies. `emitted + discarded + skipped == fragments`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReceiveReport {
    pub events: usize,
    pub fragments: usize,
    pub emitted: usize,
    pub discarded: usize,
    pub skipped: usize,
    /// Fragments whose call faulted (they are still emitted or discarded).
    pub failed: usize,
}

pub struct Worker {
    config: WorkerConfig,
    credentials: Arc<dyn CredentialStore>,
    extractor: Arc<dyn FieldExtractor>,
    client: SentimentClient,
    emitter: EventEmitter,
    activity: ActivityLog,
}

impl Worker {
    /// Validates `options` up front; no processing happens with a bad config.
    pub fn new(
        options: &WorkerOptions,
        service: Arc<dyn SentimentService>,
        credentials: Arc<dyn CredentialStore>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, ConfigError> {
        let config = WorkerConfig::from_options(options, credentials.as_ref())?;
        let mut client = SentimentClient::new(service, credentials.clone());
        client.reconfigure(&config);
        let emitter = EventEmitter::new(config.discard_unknown, sink);

        Ok(Self {
            config,
            credentials,
            extractor: Arc::new(JsonPathExtractor),
            client,
            emitter,
            activity: ActivityLog::new(),
        })
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn FieldExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn DiscardObserver>) -> Self {
        self.emitter = self.emitter.with_observer(observer);
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    /// Swap in new options (e.g. a rotated key). Invalid options leave the
    /// current configuration untouched.
    pub fn update_options(&mut self, options: &WorkerOptions) -> Result<(), ConfigError> {
        let config = WorkerConfig::from_options(options, self.credentials.as_ref())?;
        self.client.reconfigure(&config);
        self.emitter.set_discard_unknown(config.discard_unknown);
        self.config = config;
        tracing::info!(
            content = %self.config.content_path,
            period_days = self.config.expected_receive_period_days,
            discard_unknown = self.config.discard_unknown.enabled(),
            "worker options updated"
        );
        Ok(())
    }

    /// Process one batch of events in arrival order.
    pub async fn receive(&mut self, events: &[IncomingEvent]) -> ReceiveReport {
        ensure_metrics_described();
        let mut report = ReceiveReport::default();
        if events.is_empty() {
            return report;
        }

        let now = Utc::now();
        self.activity.record_receive(now);
        gauge!("worker_last_receive_ts").set(now.timestamp() as f64);

        for event in events {
            report.events += 1;
            let fragments = self
                .extractor
                .values_at(&event.payload, &self.config.content_path);
            if fragments.is_empty() {
                tracing::debug!(path = %self.config.content_path, "no fragments at path");
            }
            for content in fragments {
                report.fragments += 1;
                self.process_fragment(&content, &mut report).await;
            }
        }

        tracing::info!(
            provider = self.client.provider_name(),
            events = report.events,
            fragments = report.fragments,
            emitted = report.emitted,
            discarded = report.discarded,
            skipped = report.skipped,
            failed = report.failed,
            "receive cycle done"
        );
        report
    }

    async fn process_fragment(&mut self, content: &str, report: &mut ReceiveReport) {
        if content.trim().is_empty() {
            report.skipped += 1;
            counter!("fragments_skipped_total").increment(1);
            tracing::debug!("empty fragment skipped");
            return;
        }

        let Classification { raw, fault } = self.client.classify_traced(content).await;
        if let Some(fault) = fault {
            report.failed += 1;
            self.activity
                .record_error(Utc::now(), format!("sentiment call failed: {fault:?}"));
        }

        let record = normalize(&raw);
        match self.emitter.emit(content, &raw, record) {
            Emission::Emitted => {
                report.emitted += 1;
                self.activity.record_event(Utc::now());
            }
            Emission::Discarded => report.discarded += 1,
        }
    }

    /// Liveness at `now`. Read-only.
    pub fn working_at(&self, now: DateTime<Utc>) -> bool {
        self.activity
            .working_at(now, self.config.expected_receive_period_days)
    }

    pub fn is_working(&self) -> bool {
        self.working_at(Utc::now())
    }

    #[cfg(test)]
    pub(crate) fn activity_mut(&mut self) -> &mut ActivityLog {
        &mut self.activity
    }
}
