//! Orchestration service: the synchronous facade a host drives
//!
//! [`OrchestrationService`] joins the credential store, the provider registry
//! and the configuration file. It owns one current-thread Tokio runtime and
//! blocks on it only inside the facade methods, so hosts without an async
//! runtime can call every operation directly.
//!
//! ```rust,no_run
//! use modelmux_core::config::ProviderConfig;
//! use modelmux_core::orchestration::OrchestrationService;
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut service = OrchestrationService::open_default()?;
//! service.register_callback(|event| {
//!     println!("{event:?}");
//!     Ok(())
//! });
//! service.add_provider(
//!     "MyClaude",
//!     "sk-ant-...",
//!     ProviderConfig::with_model("claude-sonnet-4-20250514"),
//! );
//! service.test_provider_connection("MyClaude");
//! println!("{}", service.send_message_to_provider(None, "Hello", None));
//! # Ok(())
//! # }
//! ```

pub mod events;
pub mod status;

pub use events::{EventHub, ProviderEvent, SubscriptionId};
pub use status::{CallStats, InvalidTransition, ProviderState, StatusRecord};

use crate::config::{ConfigManager, ProviderConfig};
use crate::credentials::{CredentialStore, validate_format};
use crate::llm::error_display::describe_failure;
use crate::llm::factory::{create_adapter, infer_kind};
use crate::llm::provider::{ConversationMessage, ProviderError, ProviderResponse};
use crate::llm::registry::ProviderRegistry;
use crate::llm::types::BackendKind;
use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, info, warn};

/// Host-facing description of one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderSummary {
    pub name: String,
    pub kind: Option<BackendKind>,
    pub model: String,
    pub enabled: bool,
    pub active: bool,
    pub state: ProviderState,
    pub message: String,
}

pub struct OrchestrationService {
    runtime: Runtime,
    config: ConfigManager,
    store: CredentialStore,
    registry: ProviderRegistry,
    statuses: IndexMap<String, StatusRecord>,
    stats: HashMap<String, CallStats>,
    events: EventHub,
}

impl OrchestrationService {
    /// Open the data directory: `config.toml`, `credentials.json` and `credentials.salt`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let config = ConfigManager::load_from_dir(dir)?;
        let store = CredentialStore::open(dir, config.credential_settings().encrypt);
        Self::with_parts(config, store)
    }

    /// Open the per-user data directory
    pub fn open_default() -> Result<Self> {
        let dir = ConfigManager::default_dir()
            .ok_or_else(|| anyhow!("Could not determine a configuration directory"))?;
        Self::open(dir)
    }

    pub fn with_parts(config: ConfigManager, store: CredentialStore) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to start async runtime")?;
        debug!(
            config = %config.config_path().display(),
            encrypted = store.is_encrypted(),
            "orchestration service ready"
        );
        Ok(Self {
            runtime,
            config,
            store,
            registry: ProviderRegistry::new(),
            statuses: IndexMap::new(),
            stats: HashMap::new(),
            events: EventHub::new(),
        })
    }

    /// Stop the runtime; pending work is abandoned after a short grace period
    pub fn shutdown(self) {
        let Self { runtime, .. } = self;
        runtime.shutdown_timeout(Duration::from_secs(1));
        info!("orchestration service stopped");
    }

    pub fn config(&self) -> &ConfigManager {
        &self.config
    }

    pub fn credential_store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Register every enabled, configured provider that has a stored secret
    pub fn initialize_from_store(&mut self) -> usize {
        let configured: Vec<(String, ProviderConfig)> = self
            .config
            .config()
            .enabled_providers()
            .map(|(name, config)| (name.clone(), config.clone()))
            .collect();

        let mut registered = 0;
        for (name, config) in configured {
            if self.registry.contains(&name) {
                continue;
            }
            let secret = match self.store.retrieve(&name) {
                Ok(Some(secret)) => secret,
                Ok(None) => {
                    debug!(provider = %name, "no stored credential, skipping");
                    continue;
                }
                Err(err) => {
                    warn!(provider = %name, error = %err, "failed to read stored credential");
                    continue;
                }
            };
            let Some(kind) = infer_kind(&name, &secret, &config) else {
                warn!(provider = %name, "cannot determine backend type, skipping");
                continue;
            };
            match self.registry.add(&name, kind, secret, config) {
                Ok(()) => {
                    registered += 1;
                    self.reset_status(&name, "Provider initialized");
                }
                Err(err) => warn!(provider = %name, error = %err, "failed to register provider"),
            }
        }

        if let Some(preferred) = self.config.active_provider().map(str::to_string) {
            if !self.registry.set_active(&preferred) {
                debug!(provider = %preferred, "configured active provider is not registered");
            }
        }

        if registered > 0 {
            info!(count = registered, "restored providers from store");
            self.events.publish(&ProviderEvent::ProvidersChanged);
        }
        registered
    }

    /// Validate, persist and register a provider; failures are logged and reported as `false`
    pub fn add_provider(&mut self, name: &str, secret: &str, config: ProviderConfig) -> bool {
        match self.try_add_provider(name, secret, config) {
            Ok(_) => true,
            Err(err) => {
                warn!(provider = name, error = %err, "failed to add provider");
                false
            }
        }
    }

    /// Like [`add_provider`](Self::add_provider), with the failure reason
    pub fn try_add_provider(
        &mut self,
        name: &str,
        secret: &str,
        mut config: ProviderConfig,
    ) -> Result<BackendKind> {
        let name = name.trim();
        let secret = secret.trim();
        if name.is_empty() {
            bail!("Provider name cannot be empty");
        }
        if self.registry.contains(name) {
            bail!("Provider '{name}' already exists");
        }
        let kind = infer_kind(name, secret, &config).ok_or_else(|| {
            anyhow!("Cannot determine provider type for '{name}'; set `type` explicitly")
        })?;
        if !validate_format(kind, secret) {
            bail!("Secret for '{name}' is not a valid {} key", kind.display_name());
        }
        config.kind = Some(kind);

        // Build first so capability errors leave nothing behind on disk
        let adapter = create_adapter(kind, secret.to_string(), config.clone())?;

        let previous_secret = self.store.retrieve(name).ok().flatten();
        let outcome = self.store.store(name, secret)?;
        let previous_config = self.config.upsert_provider(name, config);
        if let Err(err) = self.config.save() {
            self.rollback_add(name, previous_secret, previous_config);
            return Err(err);
        }
        if let Err(err) = self.registry.register_adapter(name, adapter) {
            self.rollback_add(name, previous_secret, previous_config);
            return Err(err.into());
        }

        info!(provider = name, %kind, ?outcome, "provider added");
        self.reset_status(name, "Provider initialized");
        self.events.publish(&ProviderEvent::ProvidersChanged);
        Ok(kind)
    }

    fn rollback_add(
        &mut self,
        name: &str,
        previous_secret: Option<String>,
        previous_config: Option<ProviderConfig>,
    ) {
        let restored = match previous_secret {
            Some(secret) => self.store.store(name, &secret).map(|_| ()),
            None => self.store.delete(name).map(|_| ()),
        };
        if let Err(err) = restored {
            warn!(provider = name, error = %err, "failed to roll back stored credential");
        }

        match previous_config {
            Some(config) => {
                self.config.upsert_provider(name, config);
            }
            None => {
                self.config.remove_provider(name);
            }
        }
        if let Err(err) = self.config.save() {
            warn!(provider = name, error = %err, "failed to roll back configuration");
        }
    }

    /// Deregister `name` and delete its status, stats, secret and config entry
    ///
    /// Returns `false` for unknown names and when the removal failed; see
    /// [`try_remove_provider`](Self::try_remove_provider) for the reason.
    pub fn remove_provider(&mut self, name: &str) -> bool {
        match self.try_remove_provider(name) {
            Ok(removed) => removed,
            Err(err) => {
                warn!(provider = name, error = %err, "failed to remove provider");
                false
            }
        }
    }

    /// Like [`remove_provider`](Self::remove_provider), with the failure reason
    ///
    /// The stored secret is deleted first; if that fails the provider stays
    /// registered and configured.
    pub fn try_remove_provider(&mut self, name: &str) -> Result<bool> {
        let secret_removed = self
            .store
            .delete(name)
            .with_context(|| format!("Failed to delete stored credential for '{name}'"))?;

        let registered = self.registry.remove(name);
        self.statuses.shift_remove(name);
        self.stats.remove(name);

        let configured = self.config.remove_provider(name).is_some();
        let was_preferred = self.config.active_provider() == Some(name);
        if was_preferred {
            self.config.set_active_provider(self.registry.active_name());
        }

        let removed = registered || secret_removed || configured;
        if removed {
            info!(provider = name, active = ?self.registry.active_name(), "provider removed");
            self.events.publish(&ProviderEvent::ProvidersChanged);
        }
        if configured || was_preferred {
            self.config.save()?;
        }
        Ok(removed)
    }

    /// Probe `name` once; returns the settled state, or `None` for unknown providers
    pub fn test_provider_connection(&mut self, name: &str) -> Option<ProviderState> {
        if !self.registry.contains(name) {
            warn!(provider = name, "cannot test unknown provider");
            return None;
        }
        self.set_state(name, ProviderState::Testing, "Testing connection");

        let outcome = {
            let instance = self.registry.get(name)?;
            self.runtime.block_on(instance.adapter().test_connection())
        };

        let (state, message) = match outcome {
            Ok(()) => (ProviderState::Connected, "Connection successful".to_string()),
            Err(err) => (ProviderState::Error, describe_failure(name, &err)),
        };
        info!(provider = name, %state, "connection test finished");
        self.set_state(name, state, message);
        Some(state)
    }

    /// Send through the named (or active) provider; failures come back as descriptive text
    pub fn send_message_to_provider(
        &mut self,
        name: Option<&str>,
        message: &str,
        context: Option<&str>,
    ) -> String {
        match self.send_message(name, message, context) {
            Ok((_, response)) => response.content,
            Err(err) => {
                let target = name.or(self.registry.active_name()).unwrap_or("modelmux");
                describe_failure(target, &err)
            }
        }
    }

    /// Typed variant of [`send_message_to_provider`](Self::send_message_to_provider)
    pub fn send_message(
        &mut self,
        name: Option<&str>,
        message: &str,
        context: Option<&str>,
    ) -> Result<(String, ProviderResponse), ProviderError> {
        let target = self.registry.resolve(name)?.name().to_string();
        let started = Instant::now();
        let result = self
            .runtime
            .block_on(self.registry.send(Some(&target), message, context));
        let latency_ms = started.elapsed().as_millis() as u64;

        let stats = self.stats.entry(target.clone()).or_default();
        match &result {
            Ok((_, response)) => {
                stats.record_success(response, latency_ms);
                debug!(provider = %target, latency_ms, "message sent");
            }
            Err(err) => {
                stats.record_failure(latency_ms);
                warn!(provider = %target, error = %err, "message failed");
            }
        }
        result
    }

    pub fn get_provider_status(&self, name: &str) -> Option<&StatusRecord> {
        self.statuses.get(name)
    }

    /// Registered providers first, then configured ones that are not registered
    pub fn get_all_providers(&self) -> IndexMap<String, ProviderSummary> {
        let active = self.registry.active_name();
        let mut summaries = IndexMap::new();

        for instance in self.registry.iter() {
            let status = self.statuses.get(instance.name());
            summaries.insert(
                instance.name().to_string(),
                ProviderSummary {
                    name: instance.name().to_string(),
                    kind: Some(instance.kind()),
                    model: instance.adapter().model().to_string(),
                    enabled: instance.config().enabled,
                    active: active == Some(instance.name()),
                    state: status.map_or(ProviderState::Unknown, |s| s.state),
                    message: status.map(|s| s.message.clone()).unwrap_or_default(),
                },
            );
        }

        for (name, config) in &self.config.config().providers {
            if summaries.contains_key(name) {
                continue;
            }
            summaries.insert(
                name.clone(),
                ProviderSummary {
                    name: name.clone(),
                    kind: config.kind,
                    model: config.model.clone(),
                    enabled: config.enabled,
                    active: false,
                    state: ProviderState::Unknown,
                    message: if config.enabled {
                        "Not registered".to_string()
                    } else {
                        "Disabled".to_string()
                    },
                },
            );
        }
        summaries
    }

    /// Names whose state is initialized or connected
    pub fn get_active_providers(&self) -> Vec<String> {
        self.registry
            .iter()
            .filter(|instance| {
                self.statuses
                    .get(instance.name())
                    .is_some_and(|status| status.state.is_available())
            })
            .map(|instance| instance.name().to_string())
            .collect()
    }

    pub fn active_provider(&self) -> Option<&str> {
        self.registry.active_name()
    }

    /// Make `name` the active provider and remember it in the config file
    pub fn set_active_provider(&mut self, name: &str) -> bool {
        if !self.registry.set_active(name) {
            return false;
        }
        info!(provider = name, "active provider changed");
        self.config.set_active_provider(Some(name));
        if let Err(err) = self.config.save() {
            warn!(provider = name, error = %err, "failed to persist active provider");
        }
        true
    }

    /// Model ids for `name`; `refresh` queries the backend first
    pub fn list_models(&self, name: &str, refresh: bool) -> Result<Vec<String>, ProviderError> {
        let instance = self
            .registry
            .get(name)
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))?;
        if refresh {
            Ok(self.runtime.block_on(instance.adapter().refresh_models()))
        } else {
            Ok(instance.adapter().list_models())
        }
    }

    /// Rebuild the adapter with new settings and persist them; status restarts at initialized
    ///
    /// A configured provider that is not registered (disabled, or skipped at
    /// startup) only has its entry rewritten, and is registered when the new
    /// settings enable it and a secret is stored for it.
    pub fn update_provider_config(&mut self, name: &str, mut config: ProviderConfig) -> Result<()> {
        let Some(kind) = self.registry.get(name).map(|instance| instance.kind()) else {
            return self.update_unregistered(name, config);
        };
        config.kind = Some(config.kind.unwrap_or(kind));

        self.registry.update_config(name, config.clone())?;
        self.config.upsert_provider(name, config);
        self.config.save()?;
        self.reset_status(name, "Provider reconfigured");
        Ok(())
    }

    fn update_unregistered(&mut self, name: &str, mut config: ProviderConfig) -> Result<()> {
        let previous = self
            .config
            .provider(name)
            .ok_or_else(|| anyhow!("Provider '{name}' is not configured"))?;
        if config.kind.is_none() {
            config.kind = previous.kind;
        }

        let secret = if config.enabled {
            self.store.retrieve(name)?
        } else {
            None
        };
        // Build before persisting so a rejected config leaves the old entry in place
        let adapter = match secret {
            Some(secret) => {
                let kind = infer_kind(name, &secret, &config).ok_or_else(|| {
                    anyhow!("Cannot determine provider type for '{name}'; set `type` explicitly")
                })?;
                config.kind = Some(kind);
                Some(create_adapter(kind, secret, config.clone())?)
            }
            None => None,
        };

        self.config.upsert_provider(name, config);
        self.config.save()?;
        let Some(adapter) = adapter else {
            debug!(provider = name, "updated configuration of unregistered provider");
            return Ok(());
        };

        self.registry.register_adapter(name, adapter)?;
        if self.config.active_provider() == Some(name) {
            self.registry.set_active(name);
        }
        info!(provider = name, "provider enabled");
        self.reset_status(name, "Provider initialized");
        self.events.publish(&ProviderEvent::ProvidersChanged);
        Ok(())
    }

    pub fn provider_stats(&self, name: &str) -> Option<&CallStats> {
        self.stats.get(name)
    }

    pub fn export_history(&self, name: &str) -> Option<Vec<ConversationMessage>> {
        self.registry
            .get(name)
            .map(|instance| instance.adapter().history())
    }

    pub fn clear_history(&mut self, name: &str) -> bool {
        match self.registry.get(name) {
            Some(instance) => {
                instance.adapter().clear_history();
                true
            }
            None => false,
        }
    }

    pub fn register_callback<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&ProviderEvent) -> Result<()> + Send + 'static,
    {
        self.events.register(callback)
    }

    pub fn unregister_callback(&mut self, id: SubscriptionId) -> bool {
        self.events.unregister(id)
    }

    /// Start a fresh record for `name` and move it to initialized
    fn reset_status(&mut self, name: &str, message: &str) {
        self.statuses
            .insert(name.to_string(), StatusRecord::new(name));
        self.set_state(name, ProviderState::Initialized, message);
    }

    fn set_state(&mut self, name: &str, state: ProviderState, message: impl Into<String>) {
        let record = self
            .statuses
            .entry(name.to_string())
            .or_insert_with(|| StatusRecord::new(name));
        let message = message.into();
        if let Err(err) = record.transition(state, message.clone()) {
            warn!(error = %err, "status change rejected");
            return;
        }
        self.events.publish(&ProviderEvent::StatusChanged {
            name: name.to_string(),
            state,
            message,
        });
    }
}
