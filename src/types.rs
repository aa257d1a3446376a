// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event handed to the worker by the host. Read-only.
///
/// Unknown fields are rejected so a bare payload that merely contains a
/// `payload` member is not mistaken for the wrapped form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncomingEvent {
    pub payload: Value,
    #[serde(default = "Utc::now")]
    pub received_at: DateTime<Utc>,
}

impl IncomingEvent {
    pub fn new(payload: Value) -> Self {
        Self {
            payload,
            received_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentType {
    Positive,
    Neutral,
    Negative,
    Unknown,
}

impl SentimentType {
    /// Case-insensitive; anything outside the three sentiments is `Unknown`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "positive" => Self::Positive,
            "neutral" => Self::Neutral,
            "negative" => Self::Negative,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
            Self::Unknown => "unknown",
        }
    }
}

/// Sentiment score as the service sent it. AlchemyAPI returns decimal
/// strings (`"0.234811"`); those are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Score {
    Number(f64),
    Text(String),
}

/// Mixed-sentiment flag as the service sent it (`"1"`, `true`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Mixed {
    Flag(bool),
    Text(String),
}

/// Whatever subset of `{type, score, mixed}` the service returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSentiment {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<Score>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mixed: Option<Mixed>,
}

impl RawSentiment {
    /// Lenient field-by-field read. Fields of an unexpected JSON type are
    /// treated as absent instead of failing the whole response.
    pub fn from_value(v: &Value) -> Self {
        let kind = v.get("type").and_then(Value::as_str).map(str::to_string);
        let score = match v.get("score") {
            Some(Value::Number(n)) => n.as_f64().map(Score::Number),
            Some(Value::String(s)) => Some(Score::Text(s.clone())),
            _ => None,
        };
        let mixed = match v.get("mixed") {
            Some(Value::Bool(b)) => Some(Mixed::Flag(*b)),
            Some(Value::String(s)) => Some(Mixed::Text(s.clone())),
            Some(Value::Number(n)) => Some(Mixed::Text(n.to_string())),
            _ => None,
        };
        Self { kind, score, mixed }
    }
}

/// Outcome of one classification call.
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    Response(RawSentiment),
    /// Transport fault, empty body, timeout or missing key.
    NoResult,
}

impl RawResult {
    /// JSON view for diagnostics; `null` for `NoResult`.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Response(raw) => serde_json::to_value(raw).unwrap_or(Value::Null),
            Self::NoResult => Value::Null,
        }
    }
}

/// Canonical, fully populated classification.
///
/// `kind` is the discriminant: `score` and `mixed` only carry meaning when
/// `kind != Unknown`, since the `-1.0` sentinel is also a valid score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    #[serde(rename = "type")]
    pub kind: SentimentType,
    pub score: Score,
    pub mixed: Mixed,
}

impl ClassificationRecord {
    pub fn is_unknown(&self) -> bool {
        self.kind == SentimentType::Unknown
    }
}

/// Output record, one per kept fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedEvent {
    pub content: String,
    #[serde(rename = "type")]
    pub kind: SentimentType,
    pub score: Score,
    pub mixed: Mixed,
}

impl DerivedEvent {
    pub fn new(content: String, record: ClassificationRecord) -> Self {
        Self {
            content,
            kind: record.kind,
            score: record.score,
            mixed: record.mixed,
        }
    }
}
