use crate::config::ProviderConfig;
use crate::config::constants::{defaults, message_roles, urls};
use crate::llm::provider::{
    ConversationMessage, MessageRole, ProviderAdapter, ProviderError, ProviderResponse, Usage,
};
use crate::llm::providers::common::{
    AdapterCore, RequestOptions, data_ids, string_field, token_count,
};
use crate::llm::providers::extract_reasoning_trace;
use crate::llm::types::BackendKind;
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Adapter for the Anthropic Messages API
#[derive(Debug)]
pub struct AnthropicAdapter {
    core: AdapterCore,
}

impl AnthropicAdapter {
    pub fn new(credential: String, config: ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            core: AdapterCore::new(BackendKind::Anthropic, credential, config)?,
        })
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.core.set_min_interval(interval);
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-api-key", self.core.credential())
            .header("anthropic-version", urls::ANTHROPIC_API_VERSION)
    }

    pub(crate) fn build_request(
        &self,
        history: &[ConversationMessage],
        message: &str,
        context: Option<&str>,
        options: RequestOptions,
    ) -> Value {
        let mut messages: Vec<Value> = history
            .iter()
            .filter(|entry| entry.role != MessageRole::System)
            .map(|entry| {
                json!({
                    "role": entry.role.as_anthropic_str(),
                    "content": entry.content,
                })
            })
            .collect();
        messages.push(json!({"role": message_roles::USER, "content": message}));

        let mut request = json!({
            "model": self.core.model(),
            "messages": messages,
        });

        // Anthropic requires max_tokens to exceed the thinking budget
        if options.thinking {
            let budget = (options.max_tokens / 2).max(defaults::ANTHROPIC_MIN_THINKING_BUDGET);
            let max_tokens = if options.max_tokens > budget {
                options.max_tokens
            } else {
                budget + defaults::ANTHROPIC_MIN_THINKING_BUDGET
            };
            request["max_tokens"] = json!(max_tokens);
            request["thinking"] = json!({"type": "enabled", "budget_tokens": budget});
        } else {
            request["max_tokens"] = json!(options.max_tokens);
            request["temperature"] = json!(self.core.config().temperature);
        }

        if let Some(system) = context.filter(|text| !text.trim().is_empty()) {
            request["system"] = json!(system);
        }

        request
    }

    pub(crate) fn parse_response(&self, body: Value) -> Result<ProviderResponse, ProviderError> {
        let blocks = body
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                ProviderError::InvalidResponse("missing content in Anthropic response".to_string())
            })?;

        let mut text_parts = Vec::new();
        let mut thinking_blocks = Vec::new();
        for block in blocks {
            match string_field(block, "type") {
                Some("text") => {
                    if let Some(text) = string_field(block, "text") {
                        text_parts.push(text);
                    }
                }
                Some("thinking") => {
                    if let Some(thinking) = block.get("thinking") {
                        thinking_blocks.push(thinking.clone());
                    }
                }
                _ => {}
            }
        }

        let usage = body.get("usage").map(|usage| {
            let prompt_tokens = token_count(usage, "input_tokens");
            let completion_tokens = token_count(usage, "output_tokens");
            Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens: prompt_tokens.saturating_add(completion_tokens),
            }
        });

        let mut metadata = Map::new();
        for key in ["id", "stop_reason"] {
            if let Some(value) = body.get(key) {
                metadata.insert(key.to_string(), value.clone());
            }
        }

        Ok(ProviderResponse {
            content: text_parts.join(""),
            reasoning: extract_reasoning_trace(&Value::Array(thinking_blocks)),
            usage,
            model: string_field(&body, "model")
                .unwrap_or(self.core.model())
                .to_string(),
            metadata,
        })
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn core(&self) -> &AdapterCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut AdapterCore {
        &mut self.core
    }

    async fn send(
        &self,
        message: &str,
        context: Option<&str>,
    ) -> Result<ProviderResponse, ProviderError> {
        self.rate_limit().await;

        let history = self.core.history();
        let body = self.build_request(
            &history,
            message,
            context,
            RequestOptions::for_send(self.core.config()),
        );
        let url = format!("{}/messages", self.core.base_url());
        tracing::debug!(model = self.core.model(), turns = history.len(), "sending Anthropic request");

        let reply = self
            .core
            .execute(self.authorized(self.core.http().post(&url)).json(&body))
            .await?;
        let response = self.parse_response(reply)?;
        self.core.record_exchange(message, &response);
        Ok(response)
    }

    async fn refresh_models(&self) -> Vec<String> {
        let url = format!("{}/models", self.core.base_url());
        self.core
            .fetch_model_listing(self.authorized(self.core.http().get(&url)), data_ids)
            .await
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let body = self.build_request(&[], defaults::PROBE_PROMPT, None, RequestOptions::probe());
        let url = format!("{}/messages", self.core.base_url());
        self.core
            .execute(self.authorized(self.core.http().post(&url)).json(&body))
            .await?;
        Ok(())
    }
}
