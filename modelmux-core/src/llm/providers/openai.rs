use crate::config::ProviderConfig;
use crate::config::constants::{defaults, message_roles};
use crate::llm::provider::{
    ConversationMessage, ProviderAdapter, ProviderError, ProviderResponse, Usage,
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

/// Adapter for the OpenAI Chat Completions API
#[derive(Debug)]
pub struct OpenAIAdapter {
    core: AdapterCore,
}

impl OpenAIAdapter {
    pub fn new(credential: String, config: ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            core: AdapterCore::new(BackendKind::OpenAI, credential, config)?,
        })
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.core.set_min_interval(interval);
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(self.core.credential())
    }

    pub(crate) fn build_request(
        &self,
        history: &[ConversationMessage],
        message: &str,
        context: Option<&str>,
        options: RequestOptions,
    ) -> Value {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if let Some(system) = context.filter(|text| !text.trim().is_empty()) {
            messages.push(json!({"role": message_roles::SYSTEM, "content": system}));
        }
        messages.extend(history.iter().map(|entry| {
            json!({
                "role": entry.role.as_openai_str(),
                "content": entry.content,
            })
        }));
        messages.push(json!({"role": message_roles::USER, "content": message}));

        let mut request = json!({
            "model": self.core.model(),
            "messages": messages,
        });

        // Reasoning models reject `max_tokens` and `temperature`
        if options.thinking || self.core.supports_thinking() {
            request["max_completion_tokens"] = json!(options.max_tokens);
            if options.thinking {
                request["reasoning_effort"] = json!("high");
            }
        } else {
            request["max_tokens"] = json!(options.max_tokens);
            request["temperature"] = json!(self.core.config().temperature);
        }

        request
    }

    pub(crate) fn parse_response(&self, body: Value) -> Result<ProviderResponse, ProviderError> {
        let choice = body
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("no choices in OpenAI response".to_string())
            })?;
        let message = choice.get("message").ok_or_else(|| {
            ProviderError::InvalidResponse("choice without message in OpenAI response".to_string())
        })?;

        let content = match message.get("content") {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Array(parts)) => parts
                .iter()
                .filter_map(|part| string_field(part, "text"))
                .collect::<Vec<_>>()
                .join(""),
            _ => String::new(),
        };

        let reasoning = message
            .get("reasoning_content")
            .or_else(|| message.get("reasoning"))
            .and_then(extract_reasoning_trace);

        let usage = body.get("usage").map(|usage| {
            let prompt_tokens = token_count(usage, "prompt_tokens");
            let completion_tokens = token_count(usage, "completion_tokens");
            let total_tokens = match token_count(usage, "total_tokens") {
                0 => prompt_tokens.saturating_add(completion_tokens),
                total => total,
            };
            Usage {
                prompt_tokens,
                completion_tokens,
                total_tokens,
            }
        });

        let mut metadata = Map::new();
        if let Some(id) = body.get("id") {
            metadata.insert("id".to_string(), id.clone());
        }
        if let Some(reason) = choice.get("finish_reason") {
            metadata.insert("finish_reason".to_string(), reason.clone());
        }

        Ok(ProviderResponse {
            content,
            reasoning,
            usage,
            model: string_field(&body, "model")
                .unwrap_or(self.core.model())
                .to_string(),
            metadata,
        })
    }
}

#[async_trait]
impl ProviderAdapter for OpenAIAdapter {
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
        let url = format!("{}/chat/completions", self.core.base_url());
        tracing::debug!(model = self.core.model(), turns = history.len(), "sending OpenAI request");

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
        let url = format!("{}/chat/completions", self.core.base_url());
        self.core
            .execute(self.authorized(self.core.http().post(&url)).json(&body))
            .await?;
        Ok(())
    }
}
