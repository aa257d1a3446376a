// src/config/worker.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::credentials::{resolve_api_key, CredentialStore, PLACEHOLDER_API_KEY};
use crate::extract::{FieldPath, PathError};

const ENV_PATH: &str = "WORKER_OPTIONS_PATH";

pub const DEFAULT_CONTENT: &str = "$.text";
pub const DEFAULT_EXPECTED_RECEIVE_PERIOD_IN_DAYS: u32 = 1;
pub const DEFAULT_ALCHEMY_API_KEY: &str = PLACEHOLDER_API_KEY;
pub const DEFAULT_DISCARD_UNKNOWN_EVENTS: &str = "false";

fn default_content() -> String {
    DEFAULT_CONTENT.to_string()
}
fn default_period() -> Option<Value> {
    Some(Value::from(DEFAULT_EXPECTED_RECEIVE_PERIOD_IN_DAYS))
}
fn default_api_key() -> Option<String> {
    Some(DEFAULT_ALCHEMY_API_KEY.to_string())
}
fn default_discard() -> Value {
    Value::from(DEFAULT_DISCARD_UNKNOWN_EVENTS)
}

/// Options exactly as the host stores them. Values are loosely typed here;
/// [`WorkerConfig::from_options`] is where they get checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerOptions {
    #[serde(default = "default_content")]
    pub content: String,
    /// Number or numeric string.
    #[serde(default = "default_period")]
    pub expected_receive_period_in_days: Option<Value>,
    #[serde(default = "default_api_key")]
    pub alchemy_api_key: Option<String>,
    /// `"true"` / `"false"`; JSON booleans are accepted too.
    #[serde(default = "default_discard")]
    pub discard_unknown_events: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            content: default_content(),
            expected_receive_period_in_days: default_period(),
            alchemy_api_key: default_api_key(),
            discard_unknown_events: default_discard(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("alchemy_api_key is required to authenticate with the Alchemy API. You can provide it as an option to this worker or as a credential with the same name.")]
    MissingApiKey,
    #[error("content and expected_receive_period_in_days must be present")]
    MissingContentOrPeriod,
    #[error("content is not a valid path expression: {0}")]
    InvalidContentPath(#[from] PathError),
}

/// Whether `unknown` classifications are dropped instead of emitted.
///
/// Only the literal string `"true"` (or JSON `true`) enables it. `"TRUE"`,
/// `"yes"` and `"1"` all leave it off, matching what existing option sets
/// were written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DiscardUnknown(bool);

impl DiscardUnknown {
    pub const ENABLED_LITERAL: &'static str = "true";

    pub fn from_option(v: &Value) -> Self {
        match v {
            Value::Bool(b) => Self(*b),
            Value::String(s) => Self(s == Self::ENABLED_LITERAL),
            _ => Self(false),
        }
    }

    pub fn enabled(self) -> bool {
        self.0
    }
}

impl From<bool> for DiscardUnknown {
    fn from(b: bool) -> Self {
        Self(b)
    }
}

/// Validated, typed view of [`WorkerOptions`].
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub content_path: FieldPath,
    pub expected_receive_period_days: u32,
    /// Option value; `None` means the credential store is asked per call.
    pub api_key: Option<String>,
    pub discard_unknown: DiscardUnknown,
    pub request_timeout: Option<Duration>,
}

impl WorkerConfig {
    pub fn from_options(opts: &WorkerOptions, store: &dyn CredentialStore) -> Result<Self, ConfigError> {
        if let Some(err) = opts.validate(store).into_iter().next() {
            return Err(err);
        }
        // validate() guarantees both parse
        let content_path = FieldPath::parse(&opts.content)?;
        let expected_receive_period_days = parse_period(opts.expected_receive_period_in_days.as_ref())
            .ok_or(ConfigError::MissingContentOrPeriod)?;

        Ok(Self {
            content_path,
            expected_receive_period_days,
            api_key: opts
                .alchemy_api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
            discard_unknown: DiscardUnknown::from_option(&opts.discard_unknown_events),
            request_timeout: opts
                .request_timeout_secs
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
        })
    }
}

impl WorkerOptions {
    /// Every problem with these options, empty when valid.
    pub fn validate(&self, store: &dyn CredentialStore) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if resolve_api_key(self.alchemy_api_key.as_deref(), store).is_none() {
            errors.push(ConfigError::MissingApiKey);
        }

        let content_present = !self.content.trim().is_empty();
        let period_present = parse_period(self.expected_receive_period_in_days.as_ref()).is_some();
        if !content_present || !period_present {
            errors.push(ConfigError::MissingContentOrPeriod);
        } else if let Err(e) = FieldPath::parse(&self.content) {
            errors.push(ConfigError::InvalidContentPath(e));
        }

        errors
    }
}

fn parse_period(v: Option<&Value>) -> Option<u32> {
    let days = match v? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(days).ok().filter(|d| *d > 0)
}

/// Load options from an explicit path. TOML or JSON, picked by extension.
pub fn load_options_from(path: &Path) -> Result<WorkerOptions> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading worker options from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "toml" => toml::from_str(&content)
            .with_context(|| format!("parsing TOML options {}", path.display())),
        _ => serde_json::from_str(&content)
            .with_context(|| format!("parsing JSON options {}", path.display())),
    }
}

/// Load options using env var + fallbacks:
/// 1) $WORKER_OPTIONS_PATH
/// 2) config/worker.toml
/// 3) config/worker.json
/// 4) defaults
pub fn load_options_default() -> Result<WorkerOptions> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_options_from(&pb);
        } else {
            return Err(anyhow!("WORKER_OPTIONS_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/worker.toml");
    if toml_p.exists() {
        return load_options_from(&toml_p);
    }
    let json_p = PathBuf::from("config/worker.json");
    if json_p.exists() {
        return load_options_from(&json_p);
    }
    Ok(WorkerOptions::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{StaticCredentials, ALCHEMY_API_KEY};
    use serde_json::json;
    use std::env;

    #[test]
    fn defaults_are_valid() {
        let cfg = WorkerConfig::from_options(&WorkerOptions::default(), &StaticCredentials::new())
            .unwrap();
        assert_eq!(cfg.content_path.raw, "$.text");
        assert_eq!(cfg.expected_receive_period_days, 1);
        assert_eq!(cfg.api_key.as_deref(), Some("abc123"));
        assert!(!cfg.discard_unknown.enabled());
        assert_eq!(cfg.request_timeout, None);
    }

    #[test]
    fn missing_key_without_credential_is_rejected() {
        let opts = WorkerOptions {
            alchemy_api_key: None,
            ..Default::default()
        };
        let err = WorkerConfig::from_options(&opts, &StaticCredentials::new()).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey);
        assert!(err.to_string().starts_with("alchemy_api_key is required"));
    }

    #[test]
    fn credential_satisfies_missing_key() {
        let opts = WorkerOptions {
            alchemy_api_key: Some(String::new()),
            ..Default::default()
        };
        let store = StaticCredentials::new().with(ALCHEMY_API_KEY, "secret");
        let cfg = WorkerConfig::from_options(&opts, &store).unwrap();
        assert_eq!(cfg.api_key, None);
    }

    #[test]
    fn blank_content_or_period_is_rejected() {
        let store = StaticCredentials::new();
        let no_content = WorkerOptions {
            content: " ".into(),
            ..Default::default()
        };
        assert_eq!(
            no_content.validate(&store),
            vec![ConfigError::MissingContentOrPeriod]
        );

        for period in [None, Some(json!(0)), Some(json!("")), Some(json!("soon")), Some(json!(-3))] {
            let opts = WorkerOptions {
                expected_receive_period_in_days: period,
                ..Default::default()
            };
            assert_eq!(opts.validate(&store), vec![ConfigError::MissingContentOrPeriod]);
        }
    }

    #[test]
    fn all_problems_are_reported() {
        let opts = WorkerOptions {
            content: String::new(),
            alchemy_api_key: None,
            ..Default::default()
        };
        assert_eq!(
            opts.validate(&StaticCredentials::new()),
            vec![ConfigError::MissingApiKey, ConfigError::MissingContentOrPeriod]
        );
    }

    #[test]
    fn period_accepts_numeric_string() {
        let opts = WorkerOptions {
            expected_receive_period_in_days: Some(json!("3")),
            ..Default::default()
        };
        let cfg = WorkerConfig::from_options(&opts, &StaticCredentials::new()).unwrap();
        assert_eq!(cfg.expected_receive_period_days, 3);
    }

    #[test]
    fn broken_path_is_rejected() {
        let opts = WorkerOptions {
            content: "$.items[0".into(),
            ..Default::default()
        };
        assert!(matches!(
            WorkerConfig::from_options(&opts, &StaticCredentials::new()),
            Err(ConfigError::InvalidContentPath(_))
        ));
    }

    #[test]
    fn discard_flag_only_accepts_literal_true() {
        assert!(DiscardUnknown::from_option(&json!("true")).enabled());
        assert!(DiscardUnknown::from_option(&json!(true)).enabled());
        for v in [json!("false"), json!("TRUE"), json!("True"), json!("yes"), json!("1"), json!(1), json!(null)] {
            assert!(!DiscardUnknown::from_option(&v).enabled(), "{v} must not enable");
        }
    }

    #[test]
    fn option_bag_from_json_uses_defaults_for_missing_keys() {
        let opts: WorkerOptions =
            serde_json::from_str(r#"{ "discard_unknown_events": "true" }"#).unwrap();
        assert_eq!(opts.content, "$.text");
        assert_eq!(opts.alchemy_api_key.as_deref(), Some("abc123"));
        assert_eq!(opts.discard_unknown_events, json!("true"));
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_PATH);

        // nothing on disk
        assert_eq!(load_options_default().unwrap(), WorkerOptions::default());

        // config/worker.toml
        fs::create_dir_all(tmp.path().join("config")).unwrap();
        fs::write(
            tmp.path().join("config/worker.toml"),
            "content = \"$.body\"\nexpected_receive_period_in_days = 2\n",
        )
        .unwrap();
        let t = load_options_default().unwrap();
        assert_eq!(t.content, "$.body");
        assert_eq!(t.expected_receive_period_in_days, Some(json!(2)));

        // env wins
        let p = tmp.path().join("opts.json");
        fs::write(&p, r#"{ "content": "$.msg" }"#).unwrap();
        env::set_var(ENV_PATH, p.display().to_string());
        assert_eq!(load_options_default().unwrap().content, "$.msg");
        env::remove_var(ENV_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
