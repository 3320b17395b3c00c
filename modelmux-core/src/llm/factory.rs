use super::providers::{AnthropicAdapter, GeminiAdapter, OpenAIAdapter};
use crate::config::ProviderConfig;
use crate::credentials;
use crate::llm::provider::{ProviderAdapter, ProviderError};
use crate::llm::types::BackendKind;

/// Instantiate the adapter for `kind`
pub fn create_adapter(
    kind: BackendKind,
    credential: String,
    config: ProviderConfig,
) -> Result<Box<dyn ProviderAdapter>, ProviderError> {
    let adapter: Box<dyn ProviderAdapter> = match kind {
        BackendKind::Anthropic => Box::new(AnthropicAdapter::new(credential, config)?),
        BackendKind::OpenAI => Box::new(OpenAIAdapter::new(credential, config)?),
        BackendKind::Gemini => Box::new(GeminiAdapter::new(credential, config)?),
    };
    Ok(adapter)
}

/// Determine backend kind from a model identifier
pub fn kind_from_model(model: &str) -> Option<BackendKind> {
    let m = model.trim().to_lowercase();
    if m.starts_with("gpt-") || m.starts_with("o1") || m.starts_with("o3") || m.starts_with("o4")
    {
        Some(BackendKind::OpenAI)
    } else if m.starts_with("claude-") {
        Some(BackendKind::Anthropic)
    } else if m.contains("gemini") {
        Some(BackendKind::Gemini)
    } else {
        None
    }
}

/// Resolve the backend kind for a new provider
///
/// Order: explicit `type`, secret prefix, model name, then the provider name
/// itself (`"openai"`, `"claude"`, ...).
pub fn infer_kind(name: &str, secret: &str, config: &ProviderConfig) -> Option<BackendKind> {
    config
        .kind
        .or_else(|| credentials::infer_kind(secret))
        .or_else(|| kind_from_model(&config.model))
        .or_else(|| name.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_matching_adapter() {
        let adapter = create_adapter(
            BackendKind::Gemini,
            "AIzaSyA-0123456789abcdefghijklmnopq".to_string(),
            ProviderConfig::default(),
        )
        .unwrap();
        assert_eq!(adapter.kind(), BackendKind::Gemini);
        assert!(adapter.validate_credential());
    }

    #[test]
    fn creation_rejects_unsupported_thinking() {
        let mut config = ProviderConfig::with_model("gpt-4o");
        config.thinking_mode = true;
        let result = create_adapter(BackendKind::OpenAI, "sk-proj-0123456789abcdef".into(), config);
        assert!(matches!(result, Err(ProviderError::UnsupportedCapability(_))));
    }

    #[test]
    fn kind_inference_order() {
        let mut config = ProviderConfig::with_model("gemini-2.5-pro");
        assert_eq!(
            infer_kind("x", "sk-ant-REDACTED", &config),
            Some(BackendKind::Anthropic)
        );
        assert_eq!(infer_kind("x", "token", &config), Some(BackendKind::Gemini));

        config.kind = Some(BackendKind::OpenAI);
        assert_eq!(
            infer_kind("x", "sk-ant-REDACTED", &config),
            Some(BackendKind::OpenAI)
        );

        let bare = ProviderConfig::default();
        assert_eq!(infer_kind("Claude", "token", &bare), Some(BackendKind::Anthropic));
        assert_eq!(infer_kind("mystery", "token", &bare), None);
    }

    #[test]
    fn kind_from_model_prefixes() {
        assert_eq!(kind_from_model("o3-mini"), Some(BackendKind::OpenAI));
        assert_eq!(kind_from_model("claude-x"), Some(BackendKind::Anthropic));
        assert_eq!(kind_from_model("models/gemini-pro"), Some(BackendKind::Gemini));
        assert_eq!(kind_from_model("llama-3"), None);
    }
}
