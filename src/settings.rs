use crate::catalog::config::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::{env, str::FromStr, sync::Arc};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    #[default]
    Simulate,
    Live,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown upload mode: {0}")]
pub struct UnknownMode(String);

impl FromStr for UploadMode {
    type Err = UnknownMode;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim().to_lowercase().as_str() {
            "simulate" | "sim" => Ok(Self::Simulate),
            "live" => Ok(Self::Live),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// Operator settings. The runner takes a fresh snapshot for every dispatched
/// item, so a change never affects the call already in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    pub api_key: String,
    pub seller_id: String,
    pub base_url: String,
    pub mode: UploadMode,
    pub auto_start: bool,
}

impl AgentSettings {
    pub fn from_env() -> Self {
        Self {
            api_key: env::var("CATALOG_API_KEY").unwrap_or_default(),
            seller_id: env::var("CATALOG_SELLER_ID").unwrap_or_default(),
            base_url: DEFAULT_BASE_URL.clone(),
            mode: env::var("CATALOG_MODE")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or_default(),
            auto_start: parse_env_bool("CATALOG_AUTO_START"),
        }
    }

    /// Target URL for live uploads, falling back to the configured default.
    pub fn endpoint(&self) -> &str {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            DEFAULT_BASE_URL.as_str()
        } else {
            trimmed
        }
    }

    /// Carries the stored token over when the console sends back a blank
    /// key or the masked preview it was given.
    pub fn keep_secret_from(mut self, stored: &AgentSettings) -> Self {
        let incoming = self.api_key.trim();
        if incoming.is_empty() || incoming == preview_token(&stored.api_key) {
            self.api_key = stored.api_key.clone();
        }
        self
    }

    /// Copy that is safe to hand back to the console.
    pub fn redacted(&self) -> Self {
        Self {
            api_key: preview_token(&self.api_key),
            ..self.clone()
        }
    }
}

#[derive(Clone, Default)]
pub struct SettingsStore {
    inner: Arc<RwLock<AgentSettings>>,
}

impl SettingsStore {
    pub fn new(settings: AgentSettings) -> Self {
        Self {
            inner: Arc::new(RwLock::new(settings)),
        }
    }

    pub async fn snapshot(&self) -> AgentSettings {
        self.inner.read().await.clone()
    }

    pub async fn replace(&self, settings: AgentSettings) {
        *self.inner.write().await = settings;
    }
}

fn preview_token(token: &str) -> String {
    if token.is_empty() {
        return String::new();
    }
    let tail: String = token
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{tail}")
}

fn parse_env_bool(key: &str) -> bool {
    match env::var(key) {
        Ok(value) => matches!(
            value.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => false,
    }
}
