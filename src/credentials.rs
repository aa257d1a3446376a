// src/credentials.rs
//! Named credential lookup used when the API key is not set in the options.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Credential name shared by the option key and the credential store.
pub const ALCHEMY_API_KEY: &str = "alchemy_api_key";

/// Default option value. Stands in only when no real credential exists.
pub const PLACEHOLDER_API_KEY: &str = "abc123";

pub trait CredentialStore: Send + Sync {
    /// Returns the credential value, `None` when it is absent or blank.
    fn credential(&self, name: &str) -> Option<String>;
}

/// Reads `NAME` (upper-cased credential name) from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentials;

impl CredentialStore for EnvCredentials {
    fn credential(&self, name: &str) -> Option<String> {
        std::env::var(name.to_ascii_uppercase())
            .ok()
            .and_then(present)
    }
}

/// In-memory store; cloning shares the same map, so `set` on one handle is
/// visible to every worker holding another.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&self, name: &str, value: &str) {
        match self.inner.write() {
            Ok(mut g) => {
                g.insert(name.to_string(), value.to_string());
            }
            Err(_) => tracing::error!(credential = name, "credential store lock poisoned"),
        }
    }

    pub fn remove(&self, name: &str) {
        if let Ok(mut g) = self.inner.write() {
            g.remove(name);
        }
    }
}

impl CredentialStore for StaticCredentials {
    fn credential(&self, name: &str) -> Option<String> {
        let g = self.inner.read().ok()?;
        g.get(name).cloned().and_then(present)
    }
}

/// Options value first, credential store second. The placeholder option
/// value loses to a stored credential.
pub fn resolve_api_key(option_key: Option<&str>, store: &dyn CredentialStore) -> Option<String> {
    match option_key.map(str::to_string).and_then(present) {
        Some(key) if key != PLACEHOLDER_API_KEY => Some(key),
        placeholder => store.credential(ALCHEMY_API_KEY).or(placeholder),
    }
}

fn present(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
