//! Uniform adapter contract shared by every backend
//!
//! Each backend speaks its own REST/JSON dialect; adapters hide that behind
//! [`ProviderAdapter`] and normalize every reply into one [`ProviderResponse`].
//!
//! ## Message Role Mapping
//!
//! - **Anthropic**: `user` and `assistant` turns; the system instruction is a
//!   top-level `system` parameter.
//! - **OpenAI**: `system`, `user` and `assistant` all travel in `messages`.
//! - **Gemini**: only `user` and `model` turns; the system instruction is a
//!   separate `systemInstruction` object.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use modelmux_core::config::ProviderConfig;
//! use modelmux_core::llm::{BackendKind, ProviderAdapter, create_adapter};
//!
//! # async fn demo() -> Result<(), modelmux_core::llm::ProviderError> {
//! let adapter = create_adapter(
//!     BackendKind::Anthropic,
//!     "sk-ant-...".to_string(),
//!     ProviderConfig::with_model("claude-sonnet-4-20250514"),
//! )?;
//! let response = adapter.send("Hello", Some("Answer briefly")).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

use crate::config::ProviderConfig;
use crate::config::constants::message_roles;
use crate::llm::providers::AdapterCore;
use crate::llm::types::BackendKind;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Role string for the Gemini API, which calls the assistant `model`
    pub fn as_gemini_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system", // Sent as systemInstruction, not in contents
            MessageRole::User => "user",
            MessageRole::Assistant => "model",
        }
    }

    pub fn as_openai_str(&self) -> &'static str {
        match self {
            MessageRole::System => message_roles::SYSTEM,
            MessageRole::User => message_roles::USER,
            MessageRole::Assistant => message_roles::ASSISTANT,
        }
    }

    /// Role string for the Anthropic API; system turns are hoisted to the `system` parameter
    pub fn as_anthropic_str(&self) -> &'static str {
        self.as_openai_str()
    }
}

/// One turn of a conversation held in adapter history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub role: MessageRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_trace: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            reasoning_trace: None,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, reasoning_trace: Option<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            reasoning_trace,
            timestamp: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            reasoning_trace: None,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Normalized reply from any backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderResponse {
    pub content: String,
    pub reasoning: Option<String>,
    pub usage: Option<Usage>,
    /// Model that actually served the request
    pub model: String,
    /// Backend-specific extras such as the response id and finish reason
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Credential error: {0}")]
    Credential(String),
    #[error("Provider not found: {0}")]
    NotFound(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Unsupported capability: {0}")]
    UnsupportedCapability(String),
}

/// Coarse grouping used to render actionable failure messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Unavailable,
    Authentication,
    Connectivity,
    Generic,
}

impl ErrorCategory {
    pub fn label(&self) -> &'static str {
        match self {
            ErrorCategory::Unavailable => "service unavailable",
            ErrorCategory::Authentication => "authentication failed",
            ErrorCategory::Connectivity => "connection failed",
            ErrorCategory::Generic => "request failed",
        }
    }
}

impl ProviderError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ProviderError::Unavailable(_) | ProviderError::RateLimit(_) => {
                ErrorCategory::Unavailable
            }
            ProviderError::Authentication(_) | ProviderError::Credential(_) => {
                ErrorCategory::Authentication
            }
            ProviderError::Network(_) | ProviderError::Timeout(_) => ErrorCategory::Connectivity,
            ProviderError::NotFound(_)
            | ProviderError::InvalidRequest(_)
            | ProviderError::InvalidResponse(_)
            | ProviderError::UnsupportedCapability(_) => ErrorCategory::Generic,
        }
    }
}

/// Uniform contract implemented by every backend adapter
///
/// Backends supply the wire-format methods; bookkeeping shared by all of them
/// (history, throttling, model cache, thinking gate) is provided through
/// [`AdapterCore`].
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    fn core(&self) -> &AdapterCore;

    fn core_mut(&mut self) -> &mut AdapterCore;

    /// Send one user message, with optional system context, and record the exchange
    async fn send(
        &self,
        message: &str,
        context: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError>;

    /// Query the backend's model listing, falling back to the static catalog
    async fn refresh_models(&self) -> Vec<String>;

    /// Issue one minimal live request against the backend
    async fn test_connection(&self) -> Result<(), ProviderError>;

    fn kind(&self) -> BackendKind {
        self.core().kind()
    }

    fn model(&self) -> &str {
        self.core().model()
    }

    fn config(&self) -> &ProviderConfig {
        self.core().config()
    }

    /// Static catalog, or the result of the last successful refresh
    fn list_models(&self) -> Vec<String> {
        self.core().cached_models()
    }

    /// Local format check only; no network I/O
    fn validate_credential(&self) -> bool {
        self.core().validate_credential()
    }

    /// Wait until this adapter's minimum request interval has elapsed
    async fn rate_limit(&self) {
        self.core().throttle().await;
    }

    fn history(&self) -> Vec<ConversationMessage> {
        self.core().history()
    }

    fn clear_history(&self) {
        self.core().clear_history();
    }

    fn supports_thinking(&self) -> bool {
        self.core().supports_thinking()
    }

    fn set_thinking_mode(&mut self, enabled: bool) -> Result<(), ProviderError> {
        self.core_mut().set_thinking_mode(enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_group_related_failures() {
        assert_eq!(
            ProviderError::RateLimit("slow down".into()).category(),
            ErrorCategory::Unavailable
        );
        assert_eq!(
            ProviderError::Authentication("bad key".into()).category(),
            ErrorCategory::Authentication
        );
        assert_eq!(ProviderError::Timeout(30).category(), ErrorCategory::Connectivity);
        assert_eq!(
            ProviderError::UnsupportedCapability("thinking".into()).category(),
            ErrorCategory::Generic
        );
    }

    #[test]
    fn gemini_calls_the_assistant_model() {
        assert_eq!(MessageRole::Assistant.as_gemini_str(), "model");
        assert_eq!(MessageRole::Assistant.as_openai_str(), "assistant");
    }

    #[test]
    fn messages_serialize_with_lowercase_roles() {
        let message = ConversationMessage::assistant("hi", Some("thought".into()));
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["reasoning_trace"], "thought");
    }
}
