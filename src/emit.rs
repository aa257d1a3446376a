// src/emit.rs
//! Discard-or-emit decision for normalized records.

use std::sync::{Arc, Mutex};

use metrics::counter;
use tokio::sync::mpsc;

use crate::config::DiscardUnknown;
use crate::types::{ClassificationRecord, DerivedEvent, RawResult};

/// Receives derived events. Ownership of the event moves to the sink.
pub trait EventSink: Send + Sync {
    fn create_event(&self, event: DerivedEvent);
}

/// Told about every discarded `unknown` record.
pub trait DiscardObserver: Send + Sync {
    fn discarded(&self, content: &str, raw: &RawResult);
}

/// Logs discards through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl DiscardObserver for TracingObserver {
    fn discarded(&self, content: &str, raw: &RawResult) {
        tracing::info!(
            target: "sentiment_worker::discard",
            content = %content,
            response = %raw.to_json(),
            "sentiment response unknown, event discarded"
        );
    }
}

/// Keeps emitted events in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DerivedEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<DerivedEvent> {
        self.events.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Takes everything collected so far.
    pub fn drain(&self) -> Vec<DerivedEvent> {
        self.events
            .lock()
            .map(|mut g| std::mem::take(&mut *g))
            .unwrap_or_default()
    }
}

impl EventSink for MemorySink {
    fn create_event(&self, event: DerivedEvent) {
        match self.events.lock() {
            Ok(mut g) => g.push(event),
            Err(_) => tracing::error!("memory sink lock poisoned, event dropped"),
        }
    }
}

/// Forwards events to an unbounded channel; never blocks the worker.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DerivedEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DerivedEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn create_event(&self, event: DerivedEvent) {
        if self.tx.send(event).is_err() {
            tracing::warn!("derived event receiver closed, event dropped");
        }
    }
}

/// What [`EventEmitter::emit`] did with a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emission {
    Emitted,
    Discarded,
}

pub struct EventEmitter {
    discard_unknown: DiscardUnknown,
    sink: Arc<dyn EventSink>,
    observer: Arc<dyn DiscardObserver>,
}

impl EventEmitter {
    pub fn new(discard_unknown: DiscardUnknown, sink: Arc<dyn EventSink>) -> Self {
        Self {
            discard_unknown,
            sink,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn DiscardObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn set_discard_unknown(&mut self, discard_unknown: DiscardUnknown) {
        self.discard_unknown = discard_unknown;
    }

    pub fn should_discard(&self, record: &ClassificationRecord) -> bool {
        record.is_unknown() && self.discard_unknown.enabled()
    }

    /// Either one derived event or one observed discard, never both.
    pub fn emit(&self, content: &str, raw: &RawResult, record: ClassificationRecord) -> Emission {
        if self.should_discard(&record) {
            self.observer.discarded(content, raw);
            counter!("unknown_discarded_total").increment(1);
            return Emission::Discarded;
        }
        self.sink
            .create_event(DerivedEvent::new(content.to_string(), record));
        counter!("derived_events_total").increment(1);
        Emission::Emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::{normalize, unknown_record};
    use crate::types::{Mixed, RawSentiment, Score, SentimentType};

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, RawResult)>>,
    }

    impl DiscardObserver for Recorder {
        fn discarded(&self, content: &str, raw: &RawResult) {
            self.seen.lock().unwrap().push((content.to_string(), raw.clone()));
        }
    }

    fn positive() -> ClassificationRecord {
        ClassificationRecord {
            kind: SentimentType::Positive,
            score: Score::Text("0.5".into()),
            mixed: Mixed::Flag(false),
        }
    }

    #[test]
    fn unknown_is_kept_when_flag_off() {
        let sink = Arc::new(MemorySink::new());
        let em = EventEmitter::new(DiscardUnknown::from(false), sink.clone());
        assert!(!em.should_discard(&unknown_record()));
        assert_eq!(
            em.emit("txt", &RawResult::NoResult, unknown_record()),
            Emission::Emitted
        );
        let out = sink.snapshot();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].kind, SentimentType::Unknown);
        assert_eq!(out[0].score, Score::Number(-1.0));
        assert_eq!(out[0].mixed, Mixed::Flag(false));
    }

    #[test]
    fn unknown_is_discarded_and_observed_when_flag_on() {
        let sink = Arc::new(MemorySink::new());
        let rec = Arc::new(Recorder::default());
        let em = EventEmitter::new(DiscardUnknown::from(true), sink.clone())
            .with_observer(rec.clone());

        let raw = RawResult::Response(RawSentiment {
            kind: Some("???".into()),
            ..Default::default()
        });
        let record = normalize(&raw);
        assert_eq!(em.emit("txt", &raw, record), Emission::Discarded);

        assert!(sink.snapshot().is_empty());
        let seen = rec.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], ("txt".to_string(), raw.clone()));
    }

    #[test]
    fn known_types_are_never_discarded() {
        let sink = Arc::new(MemorySink::new());
        let em = EventEmitter::new(DiscardUnknown::from(true), sink.clone());
        assert_eq!(em.emit("a", &RawResult::NoResult, positive()), Emission::Emitted);
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.snapshot().is_empty());
    }

    #[tokio::test]
    async fn channel_sink_preserves_order() {
        let (sink, mut rx) = ChannelSink::new();
        let em = EventEmitter::new(DiscardUnknown::default(), Arc::new(sink));
        for c in ["one", "two", "three"] {
            em.emit(c, &RawResult::NoResult, positive());
        }
        drop(em);
        let mut got = Vec::new();
        while let Some(ev) = rx.recv().await {
            got.push(ev.content);
        }
        assert_eq!(got, vec!["one", "two", "three"]);
    }
}
