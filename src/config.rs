//! Proactive-engagement configuration: credentials, endpoint, and interval policy.
//!
//! Persisted as `{data_dir}/config.json` by [`crate::storage::config_store::ConfigStore`].
//! Every field has a default so a partial or missing record still loads.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_INTERVAL_MS, DEFAULT_MODEL};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bearer token for the chat endpoint. Absent or empty disables fetching.
    pub api_key: Option<String>,
    /// Full chat-completions URL. Absent or empty disables fetching.
    pub api_url: Option<String>,
    /// Model id; empty means [`DEFAULT_MODEL`].
    pub model: Option<String>,
    /// Fixed-policy delay. Zero or negative falls back to the floor.
    pub interval_ms: i64,
    /// Master switch for the scheduling loop.
    pub proactive_enabled: bool,
    /// Draw delays from the fixed candidate set instead of `interval_ms`.
    pub proactive_random_enabled: bool,
    /// Host program used to surface messages (`<cmd> -u <urgency> <title> <body>`).
    pub notify_command: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: None,
            model: None,
            interval_ms: DEFAULT_INTERVAL_MS,
            proactive_enabled: true,
            proactive_random_enabled: false,
            notify_command: None,
        }
    }
}

impl Config {
    /// Both credentials present and non-empty.
    pub fn is_complete(&self) -> bool {
        non_empty(&self.api_key).is_some() && non_empty(&self.api_url).is_some()
    }

    pub fn effective_model(&self) -> &str {
        non_empty(&self.model).unwrap_or(DEFAULT_MODEL)
    }

    /// Copy with the api key masked, for display and status output.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.api_key = self.api_key.as_deref().map(mask_secret);
        copy
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.trim().is_empty())
}

fn mask_secret(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{}", tail)
}

/// Fields accepted by the host `start` command. Only provided fields are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartRequest {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub model: Option<String>,
    pub interval_ms: Option<i64>,
    pub proactive_random_enabled: Option<bool>,
    pub notify_command: Option<String>,
}

impl StartRequest {
    /// True when the request carries no configuration at all (relaunch / resume).
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge provided fields into `config`. Returns true if anything changed.
    pub fn merge_into(&self, config: &mut Config) -> bool {
        let before = config.clone();
        if let Some(ref key) = self.api_key {
            config.api_key = Some(key.clone());
        }
        if let Some(ref url) = self.api_url {
            config.api_url = Some(url.clone());
        }
        if let Some(ref model) = self.model {
            config.model = Some(model.clone());
        }
        if let Some(ms) = self.interval_ms {
            config.interval_ms = ms;
        }
        if let Some(random) = self.proactive_random_enabled {
            config.proactive_random_enabled = random;
        }
        if let Some(ref cmd) = self.notify_command {
            config.notify_command = Some(cmd.clone()).filter(|c| !c.is_empty());
        }
        *config != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_use_defaults() {
        let config: Config = serde_json::from_str(r#"{"api_key":"k"}"#).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.interval_ms, DEFAULT_INTERVAL_MS);
        assert!(config.proactive_enabled);
        assert!(!config.proactive_random_enabled);
    }

    #[test]
    fn test_is_complete_requires_both_credentials() {
        let mut config = Config::default();
        assert!(!config.is_complete());
        config.api_key = Some("k".into());
        assert!(!config.is_complete());
        config.api_url = Some("  ".into());
        assert!(!config.is_complete());
        config.api_url = Some("http://x".into());
        assert!(config.is_complete());
    }

    #[test]
    fn test_effective_model_defaults_when_empty() {
        let mut config = Config::default();
        assert_eq!(config.effective_model(), DEFAULT_MODEL);
        config.model = Some(String::new());
        assert_eq!(config.effective_model(), DEFAULT_MODEL);
        config.model = Some("gpt-x".into());
        assert_eq!(config.effective_model(), "gpt-x");
    }

    #[test]
    fn test_merge_only_provided_fields() {
        let mut config = Config {
            api_key: Some("old".into()),
            api_url: Some("http://old".into()),
            interval_ms: 5000,
            proactive_random_enabled: true,
            ..Config::default()
        };
        let req = StartRequest {
            api_key: Some("new".into()),
            ..StartRequest::default()
        };
        assert!(req.merge_into(&mut config));
        assert_eq!(config.api_key.as_deref(), Some("new"));
        assert_eq!(config.api_url.as_deref(), Some("http://old"));
        assert_eq!(config.interval_ms, 5000);
        assert!(config.proactive_random_enabled);

        assert!(!StartRequest::default().merge_into(&mut config));
    }

    #[test]
    fn test_redacted_masks_key() {
        let config = Config {
            api_key: Some("sk-abcdef1234".into()),
            ..Config::default()
        };
        assert_eq!(config.redacted().api_key.as_deref(), Some("****1234"));
        let short = Config {
            api_key: Some("abc".into()),
            ..Config::default()
        };
        assert_eq!(short.redacted().api_key.as_deref(), Some("****"));
    }
}
