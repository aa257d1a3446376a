// tests/options_config.rs
use sentiment_worker::config::{load_options_default, load_options_from, DiscardUnknown};
use sentiment_worker::credentials::StaticCredentials;
use sentiment_worker::{ConfigError, WorkerConfig};
use serde_json::json;
use std::{env, fs};

#[test]
fn parse_toml_and_json_paths() {
    let dir = tempfile::tempdir().unwrap();

    let p_toml = dir.path().join("worker.toml");
    fs::write(
        &p_toml,
        r#"
content = "$.message.body"
expected_receive_period_in_days = "2"
alchemy_api_key = "toml-key"
discard_unknown_events = "true"
request_timeout_secs = 5
"#,
    )
    .unwrap();
    let t = load_options_from(&p_toml).unwrap();
    let cfg = WorkerConfig::from_options(&t, &StaticCredentials::new()).unwrap();
    assert_eq!(cfg.content_path.raw, "$.message.body");
    assert_eq!(cfg.expected_receive_period_days, 2);
    assert_eq!(cfg.api_key.as_deref(), Some("toml-key"));
    assert_eq!(cfg.discard_unknown, DiscardUnknown::from(true));
    assert_eq!(cfg.request_timeout, Some(std::time::Duration::from_secs(5)));

    let p_json = dir.path().join("worker.json");
    fs::write(&p_json, r#"{ "content": "$.text", "discard_unknown_events": false }"#).unwrap();
    let j = load_options_from(&p_json).unwrap();
    assert_eq!(j.discard_unknown_events, json!(false));
    assert_eq!(j.alchemy_api_key.as_deref(), Some("abc123"));
}

#[test]
fn unreadable_or_malformed_files_are_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_options_from(&dir.path().join("missing.toml")).is_err());

    let p = dir.path().join("broken.json");
    fs::write(&p, "{ not json").unwrap();
    let err = load_options_from(&p).unwrap_err();
    assert!(format!("{err:#}").contains("parsing JSON options"));
}

#[test]
fn loaded_options_still_go_through_validation() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("worker.json");
    fs::write(&p, r#"{ "content": "", "alchemy_api_key": "" }"#).unwrap();
    let opts = load_options_from(&p).unwrap();
    assert_eq!(
        opts.validate(&StaticCredentials::new()),
        vec![ConfigError::MissingApiKey, ConfigError::MissingContentOrPeriod]
    );
}

#[serial_test::serial]
#[test]
fn default_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not read
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();

    env::remove_var("WORKER_OPTIONS_PATH");

    // 1) nothing -> defaults
    let v = load_options_default().unwrap();
    assert_eq!(v.content, "$.text");

    // 2) fallback JSON in ./config/
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(cfg_dir.join("worker.json"), r#"{ "content": "$.json" }"#).unwrap();
    assert_eq!(load_options_default().unwrap().content, "$.json");

    // 3) TOML beats JSON
    fs::write(cfg_dir.join("worker.toml"), r#"content = "$.toml""#).unwrap();
    assert_eq!(load_options_default().unwrap().content, "$.toml");

    // 4) env beats both; a dangling env path is an error
    let p_env = tmp.path().join("env.json");
    fs::write(&p_env, r#"{ "content": "$.env" }"#).unwrap();
    env::set_var("WORKER_OPTIONS_PATH", p_env.display().to_string());
    assert_eq!(load_options_default().unwrap().content, "$.env");
    env::set_var("WORKER_OPTIONS_PATH", tmp.path().join("nope.json").display().to_string());
    assert!(load_options_default().is_err());
    env::remove_var("WORKER_OPTIONS_PATH");

    env::set_current_dir(&old).unwrap();
}
