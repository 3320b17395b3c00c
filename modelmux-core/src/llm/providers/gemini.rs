use crate::config::ProviderConfig;
use crate::config::constants::defaults;
use crate::llm::provider::{
    ConversationMessage, MessageRole, ProviderAdapter, ProviderError, ProviderResponse, Usage,
};
use crate::llm::providers::common::{AdapterCore, RequestOptions, string_field, token_count};
use crate::llm::providers::extract_reasoning_trace;
use crate::llm::types::BackendKind;
use async_trait::async_trait;
use reqwest::RequestBuilder;
use serde_json::{Map, Value, json};
use std::time::Duration;

/// Adapter for the Gemini generateContent API
#[derive(Debug)]
pub struct GeminiAdapter {
    core: AdapterCore,
}

impl GeminiAdapter {
    pub fn new(credential: String, config: ProviderConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            core: AdapterCore::new(BackendKind::Gemini, credential, config)?,
        })
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.core.set_min_interval(interval);
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("x-goog-api-key", self.core.credential())
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.core.base_url(),
            self.core.model()
        )
    }

    pub(crate) fn build_request(
        &self,
        history: &[ConversationMessage],
        message: &str,
        context: Option<&str>,
        options: RequestOptions,
    ) -> Value {
        let mut contents: Vec<Value> = history
            .iter()
            .filter(|entry| entry.role != MessageRole::System)
            .map(|entry| {
                json!({
                    "role": entry.role.as_gemini_str(),
                    "parts": [{"text": entry.content}],
                })
            })
            .collect();
        contents.push(json!({
            "role": MessageRole::User.as_gemini_str(),
            "parts": [{"text": message}],
        }));

        let mut generation_config = json!({
            "temperature": self.core.config().temperature,
            "maxOutputTokens": options.max_tokens,
        });
        if options.thinking {
            generation_config["thinkingConfig"] = json!({"includeThoughts": true});
        }

        let mut request = json!({
            "contents": contents,
            "generationConfig": generation_config,
        });
        if let Some(system) = context.filter(|text| !text.trim().is_empty()) {
            request["systemInstruction"] = json!({"parts": [{"text": system}]});
        }

        request
    }

    pub(crate) fn parse_response(&self, body: Value) -> Result<ProviderResponse, ProviderError> {
        let candidate = body
            .get("candidates")
            .and_then(Value::as_array)
            .and_then(|candidates| candidates.first())
            .ok_or_else(|| {
                let reason = body
                    .pointer("/promptFeedback/blockReason")
                    .and_then(Value::as_str)
                    .map(|reason| format!("prompt blocked: {reason}"))
                    .unwrap_or_else(|| "no candidates in Gemini response".to_string());
                ProviderError::InvalidResponse(reason)
            })?;

        let mut text_parts = Vec::new();
        let mut thoughts = Vec::new();
        let parts = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        for part in parts {
            let is_thought = part.get("thought").and_then(Value::as_bool).unwrap_or(false);
            match (is_thought, string_field(part, "text")) {
                (true, Some(_)) => thoughts.push(part.clone()),
                (false, Some(text)) => text_parts.push(text),
                _ => {}
            }
        }

        let usage = body.get("usageMetadata").map(|usage| {
            let prompt_tokens = token_count(usage, "promptTokenCount");
            let completion_tokens = token_count(usage, "candidatesTokenCount");
            let total_tokens = match token_count(usage, "totalTokenCount") {
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
        if let Some(reason) = candidate.get("finishReason") {
            metadata.insert("finish_reason".to_string(), reason.clone());
        }
        if let Some(id) = body.get("responseId") {
            metadata.insert("id".to_string(), id.clone());
        }

        Ok(ProviderResponse {
            content: text_parts.join(""),
            reasoning: extract_reasoning_trace(&Value::Array(thoughts)),
            usage,
            model: string_field(&body, "modelVersion")
                .unwrap_or(self.core.model())
                .to_string(),
            metadata,
        })
    }

    fn model_ids(body: &Value) -> Vec<String> {
        body.get("models")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| string_field(entry, "name"))
                    .map(|name| name.strip_prefix("models/").unwrap_or(name).to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProviderAdapter for GeminiAdapter {
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
        let url = self.generate_url();
        tracing::debug!(model = self.core.model(), turns = history.len(), "sending Gemini request");

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
            .fetch_model_listing(self.authorized(self.core.http().get(&url)), Self::model_ids)
            .await
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        let body = self.build_request(&[], defaults::PROBE_PROMPT, None, RequestOptions::probe());
        let url = self.generate_url();
        self.core
            .execute(self.authorized(self.core.http().post(&url)).json(&body))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter(config: ProviderConfig) -> GeminiAdapter {
        GeminiAdapter::new("AIzaSyA-0123456789abcdefghijklmnopq".to_string(), config).unwrap()
    }

    #[test]
    fn assistant_turns_use_model_role() {
        let adapter = adapter(ProviderConfig::with_model("gemini-2.5-flash"));
        let history = vec![
            ConversationMessage::user("first"),
            ConversationMessage::assistant("reply", None),
        ];
        let request = adapter.build_request(
            &history,
            "second",
            Some("be terse"),
            RequestOptions::for_send(adapter.config()),
        );

        assert_eq!(request["contents"][1]["role"], "model");
        assert_eq!(request["contents"][2]["parts"][0]["text"], "second");
        assert_eq!(request["systemInstruction"]["parts"][0]["text"], "be terse");
        assert!(request["generationConfig"].get("thinkingConfig").is_none());
    }

    #[test]
    fn thinking_asks_for_thought_summaries() {
        let mut config = ProviderConfig::with_model("gemini-2.5-pro");
        config.thinking_mode = true;
        let adapter = adapter(config);
        let request =
            adapter.build_request(&[], "hi", None, RequestOptions::for_send(adapter.config()));
        assert_eq!(
            request["generationConfig"]["thinkingConfig"]["includeThoughts"],
            true
        );
    }

    #[test]
    fn separates_thoughts_from_answer() {
        let adapter = adapter(ProviderConfig::default());
        let response = adapter
            .parse_response(json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [
                            {"text": "weighing options", "thought": true},
                            {"text": "Answer"}
                        ]
                    },
                    "finishReason": "STOP"
                }],
                "usageMetadata": {"promptTokenCount": 4, "candidatesTokenCount": 1, "totalTokenCount": 9},
                "modelVersion": "gemini-2.5-flash"
            }))
            .unwrap();

        assert_eq!(response.content, "Answer");
        assert_eq!(response.reasoning.as_deref(), Some("weighing options"));
        assert_eq!(response.usage.unwrap().total_tokens, 9);
        assert_eq!(response.model, "gemini-2.5-flash");
    }

    #[test]
    fn blocked_prompt_is_reported() {
        let adapter = adapter(ProviderConfig::default());
        let err = adapter
            .parse_response(json!({"promptFeedback": {"blockReason": "SAFETY"}}))
            .unwrap_err();
        assert_eq!(
            err,
            ProviderError::InvalidResponse("prompt blocked: SAFETY".to_string())
        );
    }

    #[test]
    fn model_listing_strips_resource_prefix() {
        let ids = GeminiAdapter::model_ids(&json!({
            "models": [{"name": "models/gemini-2.5-pro"}, {"name": "gemini-custom"}]
        }));
        assert_eq!(ids, vec!["gemini-2.5-pro", "gemini-custom"]);
    }
}
