//! Named collection of adapter instances with one active entry

use crate::config::ProviderConfig;
use crate::llm::error_display::describe_failure;
use crate::llm::factory::create_adapter;
use crate::llm::provider::{ProviderAdapter, ProviderError, ProviderResponse};
use crate::llm::types::BackendKind;
use indexmap::IndexMap;

/// A registered adapter under its user-chosen name
pub struct ProviderInstance {
    name: String,
    adapter: Box<dyn ProviderAdapter>,
}

impl ProviderInstance {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> BackendKind {
        self.adapter.kind()
    }

    pub fn config(&self) -> &ProviderConfig {
        self.adapter.config()
    }

    pub fn adapter(&self) -> &dyn ProviderAdapter {
        self.adapter.as_ref()
    }

    pub fn adapter_mut(&mut self) -> &mut dyn ProviderAdapter {
        self.adapter.as_mut()
    }
}

/// Registration order is preserved; it decides which provider becomes active
/// when the active one is removed.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: IndexMap<String, ProviderInstance>,
    active: Option<String>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an adapter for `kind` and register it under `name`
    pub fn add(
        &mut self,
        name: &str,
        kind: BackendKind,
        credential: String,
        config: ProviderConfig,
    ) -> Result<(), ProviderError> {
        self.check_available(name)?;
        let adapter = create_adapter(kind, credential, config)?;
        self.register_adapter(name, adapter)
    }

    /// Register an externally constructed adapter; the first entry becomes active
    pub fn register_adapter(
        &mut self,
        name: &str,
        adapter: Box<dyn ProviderAdapter>,
    ) -> Result<(), ProviderError> {
        self.check_available(name)?;
        tracing::debug!(provider = name, kind = %adapter.kind(), model = adapter.model(), "registered provider");
        self.providers.insert(
            name.to_string(),
            ProviderInstance {
                name: name.to_string(),
                adapter,
            },
        );
        if self.active.is_none() {
            self.active = Some(name.to_string());
        }
        Ok(())
    }

    fn check_available(&self, name: &str) -> Result<(), ProviderError> {
        if name.trim().is_empty() {
            return Err(ProviderError::InvalidRequest(
                "provider name cannot be empty".to_string(),
            ));
        }
        if self.providers.contains_key(name) {
            return Err(ProviderError::InvalidRequest(format!(
                "provider '{name}' is already registered"
            )));
        }
        Ok(())
    }

    /// Remove `name`; an active provider hands over to the earliest remaining one
    pub fn remove(&mut self, name: &str) -> bool {
        if self.providers.shift_remove(name).is_none() {
            return false;
        }
        if self.active.as_deref() == Some(name) {
            self.active = self.providers.keys().next().cloned();
            tracing::debug!(removed = name, active = ?self.active, "reassigned active provider");
        }
        true
    }

    pub fn set_active(&mut self, name: &str) -> bool {
        if !self.providers.contains_key(name) {
            return false;
        }
        self.active = Some(name.to_string());
        true
    }

    pub fn active_name(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn get_active(&self) -> Option<&dyn ProviderAdapter> {
        self.active
            .as_deref()
            .and_then(|name| self.providers.get(name))
            .map(ProviderInstance::adapter)
    }

    pub fn get(&self, name: &str) -> Option<&ProviderInstance> {
        self.providers.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut ProviderInstance> {
        self.providers.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProviderInstance> {
        self.providers.values()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Rebuild the adapter for `name` with new settings, keeping its position
    pub fn update_config(&mut self, name: &str, config: ProviderConfig) -> Result<(), ProviderError> {
        let instance = self
            .providers
            .get_mut(name)
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;
        let kind = config.kind.unwrap_or_else(|| instance.kind());
        let credential = instance.adapter.core().credential().to_string();
        instance.adapter = create_adapter(kind, credential, config)?;
        Ok(())
    }

    /// Explicit name wins over the active provider
    pub fn resolve(&self, name: Option<&str>) -> Result<&ProviderInstance, ProviderError> {
        match name {
            Some(name) => self
                .providers
                .get(name)
                .ok_or_else(|| ProviderError::NotFound(name.to_string())),
            None => self
                .active
                .as_deref()
                .and_then(|active| self.providers.get(active))
                .ok_or_else(|| ProviderError::NotFound("no active provider".to_string())),
        }
    }

    /// Forward a message to the resolved provider; returns the provider name with the reply
    pub async fn send(
        &self,
        name: Option<&str>,
        message: &str,
        context: Option<&str>,
    ) -> Result<(String, ProviderResponse), ProviderError> {
        let instance = self.resolve(name)?;
        let response = instance.adapter().send(message, context).await?;
        Ok((instance.name.clone(), response))
    }

    /// Like [`send`](Self::send), but failures come back as a descriptive string
    pub async fn dispatch(&self, message: &str, name: Option<&str>, context: Option<&str>) -> String {
        match self.send(name, message, context).await {
            Ok((_, response)) => response.content,
            Err(err) => {
                let target = name.or(self.active_name()).unwrap_or("modelmux");
                tracing::warn!(provider = target, error = %err, "dispatch failed");
                describe_failure(target, &err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANTHROPIC_KEY: &str = "sk-ant-REDACTED";

    fn registry_with(names: &[&str]) -> ProviderRegistry {
        let mut registry = ProviderRegistry::new();
        for name in names {
            registry
                .add(
                    name,
                    BackendKind::Anthropic,
                    ANTHROPIC_KEY.to_string(),
                    ProviderConfig::with_model("claude-x"),
                )
                .unwrap();
        }
        registry
    }

    #[test]
    fn first_provider_becomes_active() {
        let registry = registry_with(&["A", "B"]);
        assert_eq!(registry.active_name(), Some("A"));
        assert!(registry.get_active().is_some());
    }

    #[test]
    fn removing_active_reassigns_or_clears() {
        let mut registry = registry_with(&["A", "B", "C"]);
        assert!(registry.set_active("B"));
        assert!(registry.remove("B"));
        assert_eq!(registry.active_name(), Some("A"));
        assert!(registry.remove("A"));
        assert_eq!(registry.active_name(), Some("C"));
        assert!(registry.remove("C"));
        assert!(registry.active_name().is_none());
        assert!(registry.get_active().is_none());
        assert!(!registry.remove("C"));
    }

    #[test]
    fn removing_inactive_keeps_active() {
        let mut registry = registry_with(&["A", "B"]);
        assert!(registry.remove("B"));
        assert_eq!(registry.active_name(), Some("A"));
    }

    #[test]
    fn duplicate_and_empty_names_are_rejected() {
        let mut registry = registry_with(&["A"]);
        let duplicate = registry.add(
            "A",
            BackendKind::Anthropic,
            ANTHROPIC_KEY.to_string(),
            ProviderConfig::default(),
        );
        assert!(matches!(duplicate, Err(ProviderError::InvalidRequest(_))));
        let empty = registry.add(
            " ",
            BackendKind::Anthropic,
            ANTHROPIC_KEY.to_string(),
            ProviderConfig::default(),
        );
        assert!(matches!(empty, Err(ProviderError::InvalidRequest(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn set_active_requires_known_name() {
        let mut registry = registry_with(&["A"]);
        assert!(!registry.set_active("missing"));
        assert_eq!(registry.active_name(), Some("A"));
    }

    #[test]
    fn update_config_keeps_order_and_credential() {
        let mut registry = registry_with(&["A", "B"]);
        registry
            .update_config("A", ProviderConfig::with_model("claude-3-5-haiku-20241022"))
            .unwrap();
        assert_eq!(registry.names(), vec!["A".to_string(), "B".to_string()]);
        let updated = registry.get("A").unwrap();
        assert_eq!(updated.adapter().model(), "claude-3-5-haiku-20241022");
        assert!(updated.adapter().validate_credential());
        assert!(matches!(
            registry.update_config("Z", ProviderConfig::default()),
            Err(ProviderError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn dispatch_reports_unknown_provider_as_text() {
        let registry = registry_with(&["A"]);
        let reply = registry.dispatch("hi", Some("missing"), None).await;
        assert!(reply.contains("missing"));
        assert!(reply.contains("not found"));
    }
}
