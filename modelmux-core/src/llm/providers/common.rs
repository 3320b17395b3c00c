use crate::config::ProviderConfig;
use crate::config::constants::{defaults, model_helpers, urls};
use crate::credentials::validate_format;
use crate::llm::history::ConversationHistory;
use crate::llm::provider::{ConversationMessage, ProviderError, ProviderResponse};
use crate::llm::rate_limiter::RateLimiter;
use crate::llm::types::BackendKind;
use parking_lot::Mutex;
use reqwest::{Client as HttpClient, RequestBuilder, StatusCode};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// Per-request knobs that differ between normal sends and connection probes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    pub max_tokens: u32,
    pub thinking: bool,
}

impl RequestOptions {
    pub fn for_send(config: &ProviderConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            thinking: config.thinking_mode,
        }
    }

    pub fn probe() -> Self {
        Self {
            max_tokens: defaults::PROBE_MAX_TOKENS,
            thinking: false,
        }
    }
}

/// State and plumbing shared by every backend adapter
pub struct AdapterCore {
    kind: BackendKind,
    credential: String,
    config: ProviderConfig,
    model: String,
    base_url: String,
    http: HttpClient,
    history: Mutex<ConversationHistory>,
    limiter: RateLimiter,
    models: Mutex<Option<Vec<String>>>,
}

impl fmt::Debug for AdapterCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterCore")
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl AdapterCore {
    pub fn new(
        kind: BackendKind,
        credential: String,
        config: ProviderConfig,
    ) -> Result<Self, ProviderError> {
        if credential.trim().is_empty() {
            return Err(ProviderError::Credential(format!(
                "{} credential is empty",
                kind.display_name()
            )));
        }

        let http = HttpClient::builder()
            .timeout(config.timeout_duration())
            .build()
            .map_err(|err| ProviderError::Network(format!("failed to build HTTP client: {err}")))?;

        let base_url = config
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| default_base_url(kind))
            .trim_end_matches('/')
            .to_string();

        let model = config.resolved_model(kind);
        let core = Self {
            kind,
            credential: credential.trim().to_string(),
            model,
            base_url,
            http,
            history: Mutex::new(ConversationHistory::new(defaults::MAX_HISTORY_MESSAGES)),
            limiter: RateLimiter::new(Duration::from_millis(
                defaults::DEFAULT_MIN_REQUEST_INTERVAL_MS,
            )),
            models: Mutex::new(None),
            config,
        };

        if core.config.thinking_mode && !core.supports_thinking() {
            return Err(core.thinking_unsupported());
        }
        Ok(core)
    }

    /// Replace the minimum spacing between requests
    pub fn set_min_interval(&mut self, interval: Duration) {
        self.limiter = RateLimiter::new(interval);
    }

    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    pub fn validate_credential(&self) -> bool {
        validate_format(self.kind, &self.credential)
    }

    pub fn supports_thinking(&self) -> bool {
        model_helpers::thinking_models_for(self.kind.as_str())
            .iter()
            .any(|allowed| {
                self.model == *allowed
                    || self
                        .model
                        .strip_prefix(allowed)
                        .is_some_and(|rest| rest.starts_with('-'))
            })
    }

    pub fn set_thinking_mode(&mut self, enabled: bool) -> Result<(), ProviderError> {
        if enabled && !self.supports_thinking() {
            return Err(self.thinking_unsupported());
        }
        self.config.thinking_mode = enabled;
        Ok(())
    }

    fn thinking_unsupported(&self) -> ProviderError {
        ProviderError::UnsupportedCapability(format!(
            "thinking mode is not available for {} model '{}'",
            self.kind.display_name(),
            self.model
        ))
    }

    pub async fn throttle(&self) {
        self.limiter.wait().await;
    }

    pub fn history(&self) -> Vec<ConversationMessage> {
        self.history.lock().to_vec()
    }

    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Append a completed exchange to the history window
    pub fn record_exchange(&self, message: &str, response: &ProviderResponse) {
        let mut history = self.history.lock();
        history.push(ConversationMessage::user(message));
        history.push(ConversationMessage::assistant(
            response.content.clone(),
            response.reasoning.clone(),
        ));
    }

    /// Models from the last successful refresh, or the static catalog
    pub fn cached_models(&self) -> Vec<String> {
        if let Some(models) = self.models.lock().as_ref() {
            return models.clone();
        }
        static_models(self.kind)
    }

    /// Store a refreshed listing; an empty listing falls back to the static catalog
    pub fn cache_models(&self, models: Vec<String>) -> Vec<String> {
        if models.is_empty() {
            return self.cached_models();
        }
        *self.models.lock() = Some(models.clone());
        models
    }

    /// Send a prepared request and decode the JSON body of a 2xx reply
    pub async fn execute(&self, request: RequestBuilder) -> Result<Value, ProviderError> {
        let response = request
            .send()
            .await
            .map_err(|err| self.transport_error(err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &body));
        }

        response.json::<Value>().await.map_err(|err| {
            if err.is_timeout() {
                ProviderError::Timeout(self.config.timeout)
            } else {
                ProviderError::InvalidResponse(format!("failed to parse response body: {err}"))
            }
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout(self.config.timeout)
        } else {
            ProviderError::Network(err.to_string())
        }
    }

    /// Fetch and decode the backend's model listing endpoint
    pub async fn fetch_model_listing(
        &self,
        request: RequestBuilder,
        extract: fn(&Value) -> Vec<String>,
    ) -> Vec<String> {
        match self.execute(request).await {
            Ok(body) => {
                let models = extract(&body);
                tracing::debug!(
                    kind = %self.kind,
                    count = models.len(),
                    "refreshed model listing"
                );
                self.cache_models(models)
            }
            Err(err) => {
                tracing::warn!(
                    kind = %self.kind,
                    error = %err,
                    "model listing failed, using static catalog"
                );
                static_models(self.kind)
            }
        }
    }
}

pub fn default_base_url(kind: BackendKind) -> &'static str {
    match kind {
        BackendKind::Anthropic => urls::ANTHROPIC_API_BASE,
        BackendKind::OpenAI => urls::OPENAI_API_BASE,
        BackendKind::Gemini => urls::GEMINI_API_BASE,
    }
}

pub fn static_models(kind: BackendKind) -> Vec<String> {
    model_helpers::supported_for(kind.as_str())
        .unwrap_or_default()
        .iter()
        .map(|model| model.to_string())
        .collect()
}

/// Map a non-2xx status to a typed error, keeping the backend's own message when present
pub(crate) fn map_status(status: StatusCode, body: &str) -> ProviderError {
    let detail = format!("HTTP {}: {}", status.as_u16(), error_message(body));
    match status.as_u16() {
        401 | 403 => ProviderError::Authentication(detail),
        429 => ProviderError::RateLimit(detail),
        500 | 502 | 503 | 504 | 529 => ProviderError::Unavailable(detail),
        _ => ProviderError::Network(detail),
    }
}

fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed.as_ref().and_then(|value| {
        value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .and_then(Value::as_str)
    });
    match message {
        Some(message) => message.to_string(),
        None => body.trim().to_string(),
    }
}

pub(crate) fn string_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

/// Ids from a `{"data": [{"id": ...}]}` model listing
pub(crate) fn data_ids(body: &Value) -> Vec<String> {
    body.get("data")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| string_field(entry, "id"))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

pub(crate) fn token_count(value: &Value, key: &str) -> u32 {
    value
        .get(key)
        .and_then(Value::as_u64)
        .map(|count| count.min(u32::MAX as u64) as u32)
        .unwrap_or(0)
}
