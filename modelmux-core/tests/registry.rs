use async_trait::async_trait;
use modelmux_core::config::ProviderConfig;
use modelmux_core::llm::providers::AdapterCore;
use modelmux_core::llm::{
    BackendKind, ProviderAdapter, ProviderError, ProviderRegistry, ProviderResponse,
};

/// Offline adapter that echoes the message back
struct EchoAdapter {
    core: AdapterCore,
    fail_with: Option<ProviderError>,
}

impl EchoAdapter {
    fn boxed() -> Box<dyn ProviderAdapter> {
        Box::new(Self::new(None))
    }

    fn failing(error: ProviderError) -> Box<dyn ProviderAdapter> {
        Box::new(Self::new(Some(error)))
    }

    fn new(fail_with: Option<ProviderError>) -> Self {
        let core = AdapterCore::new(
            BackendKind::OpenAI,
            "sk-test-0123456789abcdef".to_string(),
            ProviderConfig::with_model("echo-1"),
        )
        .unwrap();
        Self { core, fail_with }
    }
}

#[async_trait]
impl ProviderAdapter for EchoAdapter {
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
        if let Some(err) = &self.fail_with {
            return Err(err.clone());
        }
        let response = ProviderResponse {
            content: match context {
                Some(context) => format!("[{context}] {message}"),
                None => message.to_string(),
            },
            reasoning: None,
            usage: None,
            model: self.core.model().to_string(),
            metadata: Default::default(),
        };
        self.core.record_exchange(message, &response);
        Ok(response)
    }

    async fn refresh_models(&self) -> Vec<String> {
        self.core.cache_models(vec!["echo-1".to_string(), "echo-2".to_string()])
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[test]
fn removing_active_hands_over_to_remaining_provider() {
    let mut registry = ProviderRegistry::new();
    registry.register_adapter("A", EchoAdapter::boxed()).unwrap();
    registry.register_adapter("B", EchoAdapter::boxed()).unwrap();
    assert_eq!(registry.active_name(), Some("A"));

    assert!(registry.remove("A"));
    assert_eq!(registry.active_name(), Some("B"));
    assert!(registry.remove("B"));
    assert_eq!(registry.active_name(), None);
    assert!(registry.is_empty());
}

#[test]
fn removing_inactive_keeps_active_pointer() {
    let mut registry = ProviderRegistry::new();
    for name in ["A", "B", "C"] {
        registry.register_adapter(name, EchoAdapter::boxed()).unwrap();
    }
    assert!(registry.set_active("C"));
    assert!(registry.remove("B"));
    assert_eq!(registry.active_name(), Some("C"));
    assert_eq!(registry.names(), vec!["A", "C"]);
    assert!(!registry.remove("B"));
}

#[test]
fn duplicate_and_empty_names_are_rejected() {
    let mut registry = ProviderRegistry::new();
    registry.register_adapter("A", EchoAdapter::boxed()).unwrap();
    assert!(matches!(
        registry.register_adapter("A", EchoAdapter::boxed()),
        Err(ProviderError::InvalidRequest(_))
    ));
    assert!(registry.register_adapter("  ", EchoAdapter::boxed()).is_err());
    assert_eq!(registry.len(), 1);
}

#[tokio::test]
async fn send_targets_active_or_named_provider() {
    let mut registry = ProviderRegistry::new();
    registry.register_adapter("A", EchoAdapter::boxed()).unwrap();
    registry.register_adapter("B", EchoAdapter::boxed()).unwrap();

    let (name, response) = registry.send(None, "hello", None).await.unwrap();
    assert_eq!(name, "A");
    assert_eq!(response.content, "hello");

    let (name, response) = registry.send(Some("B"), "hi", Some("ctx")).await.unwrap();
    assert_eq!(name, "B");
    assert_eq!(response.content, "[ctx] hi");
    assert_eq!(registry.get("B").unwrap().adapter().history().len(), 2);
    assert_eq!(registry.get("A").unwrap().adapter().history().len(), 2);
}

#[tokio::test]
async fn dispatch_turns_failures_into_descriptive_text() {
    let mut registry = ProviderRegistry::new();
    assert!(registry.dispatch("hello", None, None).await.contains("no active provider"));

    registry
        .register_adapter(
            "Flaky",
            EchoAdapter::failing(ProviderError::Unavailable("HTTP 529: Overloaded".into())),
        )
        .unwrap();
    let reply = registry.dispatch("hello", None, None).await;
    assert!(reply.starts_with("Flaky service unavailable"), "{reply}");

    let reply = registry.dispatch("hello", Some("Ghost"), None).await;
    assert!(reply.contains("Ghost"), "{reply}");
}

#[tokio::test]
async fn adapter_defaults_come_from_the_shared_core() {
    let mut registry = ProviderRegistry::new();
    registry.register_adapter("A", EchoAdapter::boxed()).unwrap();
    let adapter = registry.get_active().unwrap();

    assert_eq!(adapter.kind(), BackendKind::OpenAI);
    assert_eq!(adapter.model(), "echo-1");
    assert!(adapter.validate_credential());
    assert!(!adapter.supports_thinking());
    assert_eq!(adapter.refresh_models().await, vec!["echo-1", "echo-2"]);
    assert_eq!(adapter.list_models(), vec!["echo-1", "echo-2"]);

    let instance = registry.get_mut("A").unwrap();
    assert!(matches!(
        instance.adapter_mut().set_thinking_mode(true),
        Err(ProviderError::UnsupportedCapability(_))
    ));
}
