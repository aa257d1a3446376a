// src/client.rs
//! Sentiment client: transport abstraction + per-call key resolution.
//!
//! [`SentimentService`] is the remote call. [`SentimentClient`] wraps it and
//! turns every fault into [`RawResult::NoResult`], so nothing above this
//! module ever sees a transport error.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use metrics::counter;
use serde_json::Value;

use crate::config::WorkerConfig;
use crate::credentials::{resolve_api_key, CredentialStore};
use crate::types::{RawResult, RawSentiment};

pub const DEFAULT_ALCHEMY_BASE_URL: &str = "https://gateway-a.watsonplatform.net";
const ENV_BASE_URL: &str = "ALCHEMY_BASE_URL";

/// One remote sentiment request. The key is passed on every call.
#[async_trait::async_trait]
pub trait SentimentService: Send + Sync {
    /// `Ok(None)` for an empty/null response, `Err` for transport or
    /// protocol faults.
    async fn sentiment(&self, api_key: &str, text: &str) -> Result<Option<RawSentiment>>;
    fn name(&self) -> &'static str;
}

/// AlchemyAPI `TextGetTextSentiment` over HTTPS.
pub struct AlchemyHttpService {
    http: reqwest::Client,
    base_url: String,
}

impl AlchemyHttpService {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("sentiment-worker/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .build()
            .context("building reqwest client")?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// `$ALCHEMY_BASE_URL` or the public gateway.
    pub fn from_env() -> Result<Self> {
        let base = std::env::var(ENV_BASE_URL).unwrap_or_else(|_| DEFAULT_ALCHEMY_BASE_URL.to_string());
        Self::new(base)
    }

    fn endpoint(&self) -> String {
        format!("{}/calls/text/TextGetTextSentiment", self.base_url)
    }
}

#[async_trait::async_trait]
impl SentimentService for AlchemyHttpService {
    async fn sentiment(&self, api_key: &str, text: &str) -> Result<Option<RawSentiment>> {
        let resp = self
            .http
            .post(self.endpoint())
            .form(&[("apikey", api_key), ("text", text), ("outputMode", "json")])
            .send()
            .await
            .context("alchemy post")?
            .error_for_status()
            .context("alchemy non-2xx")?;

        let body = resp.text().await.context("read alchemy body")?;
        parse_alchemy_body(&body)
    }

    fn name(&self) -> &'static str {
        "alchemy"
    }
}

/// Extracts `docSentiment` from an AlchemyAPI JSON body.
pub fn parse_alchemy_body(body: &str) -> Result<Option<RawSentiment>> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(None);
    }
    let v: Value = serde_json::from_str(trimmed).context("parse alchemy JSON")?;
    let status = v.get("status").and_then(Value::as_str).unwrap_or("OK");
    if !status.eq_ignore_ascii_case("OK") {
        let info = v
            .get("statusInfo")
            .and_then(Value::as_str)
            .unwrap_or("no statusInfo");
        bail!("alchemy status {status}: {info}");
    }
    Ok(v
        .get("docSentiment")
        .filter(|d| d.is_object())
        .map(RawSentiment::from_value))
}

/// Why a call produced `NoResult` instead of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFault {
    MissingKey,
    Timeout,
    Transport(String),
}

impl ClientFault {
    fn label(&self) -> &'static str {
        match self {
            Self::MissingKey => "missing_key",
            Self::Timeout => "timeout",
            Self::Transport(_) => "transport",
        }
    }
}

/// Raw result plus the fault behind a `NoResult`, if any. An empty response
/// is `NoResult` without a fault.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub raw: RawResult,
    pub fault: Option<ClientFault>,
}

pub struct SentimentClient {
    service: Arc<dyn SentimentService>,
    credentials: Arc<dyn CredentialStore>,
    option_key: Option<String>,
    timeout: Option<Duration>,
}

impl SentimentClient {
    pub fn new(service: Arc<dyn SentimentService>, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            service,
            credentials,
            option_key: None,
            timeout: None,
        }
    }

    /// Picks up the option key and timeout of a (new) configuration.
    pub fn reconfigure(&mut self, cfg: &WorkerConfig) {
        self.option_key = cfg.api_key.clone();
        self.timeout = cfg.request_timeout;
    }

    pub fn provider_name(&self) -> &'static str {
        self.service.name()
    }

    pub async fn classify(&self, text: &str) -> RawResult {
        self.classify_traced(text).await.raw
    }

    /// Same as [`classify`](Self::classify) but keeps the fault for callers
    /// that track errors.
    pub async fn classify_traced(&self, text: &str) -> Classification {
        // Resolved on every call so rotated keys apply without a restart.
        let Some(api_key) = resolve_api_key(self.option_key.as_deref(), self.credentials.as_ref())
        else {
            return self.failed(ClientFault::MissingKey);
        };

        counter!("sentiment_requests_total").increment(1);
        let call = self.service.sentiment(&api_key, text);
        let outcome = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(res) => res,
                Err(_) => return self.failed(ClientFault::Timeout),
            },
            None => call.await,
        };

        match outcome {
            Ok(Some(raw)) => Classification {
                raw: RawResult::Response(raw),
                fault: None,
            },
            Ok(None) => {
                tracing::debug!(provider = self.service.name(), "empty sentiment response");
                Classification {
                    raw: RawResult::NoResult,
                    fault: None,
                }
            }
            Err(e) => self.failed(ClientFault::Transport(format!("{e:#}"))),
        }
    }

    fn failed(&self, fault: ClientFault) -> Classification {
        tracing::warn!(
            provider = self.service.name(),
            reason = fault.label(),
            fault = ?fault,
            "sentiment call failed"
        );
        counter!("sentiment_failures_total", "reason" => fault.label()).increment(1);
        Classification {
            raw: RawResult::NoResult,
            fault: Some(fault),
        }
    }
}
