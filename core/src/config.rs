//! Client configuration.
//!
//! Base URL, user id and timeout budgets are fixed when the client is built.
//! Defaults match the mobile app: 10s for plain CRUD, 45s for chat text and
//! 60s for audio, both of which wait on model-backed work server-side.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_USER_ID: &str = "default";

pub const ENV_BASE_URL: &str = "ASSISTANT_API_URL";
pub const ENV_USER_ID: &str = "ASSISTANT_USER_ID";
pub const ENV_TIMEOUT_SECS: &str = "ASSISTANT_TIMEOUT_SECS";

/// Per-request timeout budgets, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub default_secs: u64,
    pub chat_secs: u64,
    pub audio_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_secs: 10,
            chat_secs: 45,
            audio_secs: 60,
        }
    }
}

impl Timeouts {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_secs)
    }

    pub fn chat(&self) -> Duration {
        Duration::from_secs(self.chat_secs)
    }

    pub fn audio(&self) -> Duration {
        Duration::from_secs(self.audio_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_id: String,
    pub timeouts: Timeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_id: DEFAULT_USER_ID.to_string(),
            timeouts: Timeouts::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `ASSISTANT_API_URL`, `ASSISTANT_USER_ID` and
    /// `ASSISTANT_TIMEOUT_SECS` (the plain CRUD budget only).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(url) = lookup(ENV_BASE_URL) {
            if url.trim().is_empty() {
                return Err(ConfigError::Empty { var: ENV_BASE_URL });
            }
            config.base_url = url.trim().to_string();
        }
        if let Some(user) = lookup(ENV_USER_ID) {
            if user.trim().is_empty() {
                return Err(ConfigError::Empty { var: ENV_USER_ID });
            }
            config.user_id = user.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or(ConfigError::InvalidTimeout {
                    var: ENV_TIMEOUT_SECS,
                    value: raw.clone(),
                })?;
            config.timeouts.default_secs = secs;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn defaults_match_mobile_budgets() {
        let config = ClientConfig::default();
        assert_eq!(config.timeouts.default_timeout(), Duration::from_secs(10));
        assert_eq!(config.timeouts.chat(), Duration::from_secs(45));
        assert_eq!(config.timeouts.audio(), Duration::from_secs(60));
        assert_eq!(config.user_id, "default");
    }

    #[test]
    fn env_overrides_apply() {
        let config = ClientConfig::from_lookup(lookup(&[
            (ENV_BASE_URL, "http://10.0.0.2:8000/"),
            (ENV_USER_ID, "ayse"),
            (ENV_TIMEOUT_SECS, "5"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://10.0.0.2:8000/");
        assert_eq!(config.user_id, "ayse");
        assert_eq!(config.timeouts.default_secs, 5);
        assert_eq!(config.timeouts.chat_secs, 45);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_TIMEOUT_SECS, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout { .. }));
    }

    #[test]
    fn blank_url_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[(ENV_BASE_URL, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::Empty { var: ENV_BASE_URL }));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url":"http://host:1","timeouts":{"chat_secs":5}}"#).unwrap();
        assert_eq!(config.base_url, "http://host:1");
        assert_eq!(config.user_id, "default");
        assert_eq!(config.timeouts.chat_secs, 5);
        assert_eq!(config.timeouts.audio_secs, 60);
    }
}
