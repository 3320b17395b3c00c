use crate::config::constants::{defaults, model_helpers};
use crate::llm::types::BackendKind;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Per-provider settings persisted under `[providers.<name>]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Backend kind; inferred from the secret or model when absent
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<BackendKind>,

    /// Disabled providers are skipped on startup
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Model identifier; empty selects the backend default
    #[serde(default)]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Request extended reasoning from models that support it
    #[serde(default)]
    pub thinking_mode: bool,

    /// Endpoint override (proxies, gateways, test servers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_temperature() -> f32 {
    defaults::DEFAULT_TEMPERATURE
}
fn default_max_tokens() -> u32 {
    defaults::DEFAULT_MAX_TOKENS
}
fn default_timeout() -> u64 {
    defaults::DEFAULT_TIMEOUT_SECS
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: None,
            enabled: default_true(),
            model: String::new(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout: default_timeout(),
            thinking_mode: false,
            base_url: None,
        }
    }
}

impl ProviderConfig {
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    /// Configured model, or the backend default when none is set
    pub fn resolved_model(&self, kind: BackendKind) -> String {
        let trimmed = self.model.trim();
        if trimmed.is_empty() {
            model_helpers::default_for(kind.as_str())
                .unwrap_or_default()
                .to_string()
        } else {
            trimmed.to_string()
        }
    }
}

/// `[credentials]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CredentialSettings {
    /// Encrypt secrets at rest; `false` stores them as plaintext
    #[serde(default = "default_true")]
    pub encrypt: bool,
}

impl Default for CredentialSettings {
    fn default() -> Self {
        Self {
            encrypt: default_true(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: ProviderConfig = toml::from_str("model = \"gpt-4o\"").unwrap();
        assert!(config.enabled);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.max_tokens, defaults::DEFAULT_MAX_TOKENS);
        assert_eq!(config.timeout, defaults::DEFAULT_TIMEOUT_SECS);
        assert!(!config.thinking_mode);
        assert!(config.kind.is_none());
    }

    #[test]
    fn type_field_maps_to_kind() {
        let config: ProviderConfig = toml::from_str("type = \"gemini\"").unwrap();
        assert_eq!(config.kind, Some(BackendKind::Gemini));
    }

    #[test]
    fn empty_model_resolves_to_backend_default() {
        let config = ProviderConfig::default();
        assert_eq!(
            config.resolved_model(BackendKind::Anthropic),
            crate::config::constants::models::anthropic::DEFAULT_MODEL
        );
        let config = ProviderConfig::with_model(" claude-x ");
        assert_eq!(config.resolved_model(BackendKind::Anthropic), "claude-x");
    }
}
