// src/normalize.rs
//! Maps raw service output into a [`ClassificationRecord`].
//!
//! Defaulting is per field: whatever the service did return is kept, only the
//! missing or empty fields get the sentinel. `NoResult` gets all three.

use crate::types::{ClassificationRecord, Mixed, RawResult, RawSentiment, Score, SentimentType};

pub const UNKNOWN_TYPE: SentimentType = SentimentType::Unknown;
pub const UNKNOWN_SCORE: f64 = -1.0;
pub const UNKNOWN_MIXED: bool = false;

/// The `(unknown, -1.0, false)` record.
pub fn unknown_record() -> ClassificationRecord {
    ClassificationRecord {
        kind: UNKNOWN_TYPE,
        score: Score::Number(UNKNOWN_SCORE),
        mixed: Mixed::Flag(UNKNOWN_MIXED),
    }
}

pub fn normalize(raw: &RawResult) -> ClassificationRecord {
    match raw {
        RawResult::NoResult => unknown_record(),
        RawResult::Response(r) => normalize_fields(r),
    }
}

fn normalize_fields(raw: &RawSentiment) -> ClassificationRecord {
    let kind = raw
        .kind
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(SentimentType::from_label)
        .unwrap_or(UNKNOWN_TYPE);

    let score = match &raw.score {
        Some(Score::Text(s)) if !s.trim().is_empty() => Score::Text(s.clone()),
        Some(Score::Number(n)) if n.is_finite() => Score::Number(*n),
        _ => Score::Number(UNKNOWN_SCORE),
    };

    let mixed = match &raw.mixed {
        Some(Mixed::Text(s)) if !s.trim().is_empty() => Mixed::Text(s.clone()),
        Some(Mixed::Flag(b)) => Mixed::Flag(*b),
        _ => Mixed::Flag(UNKNOWN_MIXED),
    };

    ClassificationRecord { kind, score, mixed }
}
