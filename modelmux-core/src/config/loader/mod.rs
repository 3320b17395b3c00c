use crate::config::constants::paths;
use crate::config::provider::{CredentialSettings, ProviderConfig};
use crate::utils::write_private_file;
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration document for modelmux
///
/// Sections this crate does not own (UI layout, tool defaults, ...) are kept
/// in `other` and written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MuxConfig {
    /// Provider targeted when a request names none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_provider: Option<String>,

    /// Secret storage settings
    #[serde(default)]
    pub credentials: CredentialSettings,

    /// Provider instances keyed by their user-chosen name
    #[serde(default)]
    pub providers: IndexMap<String, ProviderConfig>,

    #[serde(flatten)]
    pub other: toml::Table,
}

impl MuxConfig {
    /// Names of providers that should be registered on startup
    pub fn enabled_providers(&self) -> impl Iterator<Item = (&String, &ProviderConfig)> {
        self.providers.iter().filter(|(_, config)| config.enabled)
    }
}

/// Loads, mutates and persists the configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: MuxConfig,
    config_path: PathBuf,
}

impl ConfigManager {
    /// Default data directory (`<config dir>/modelmux`)
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .map(|base| base.join(paths::APP_DIR_NAME))
    }

    /// Load `config.toml` from a data directory
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::load_from_file(dir.as_ref().join(paths::CONFIG_FILE_NAME))
    }

    /// Load configuration from a specific file, using defaults when it does not exist yet
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self {
                config: MuxConfig::default(),
                config_path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: MuxConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(Self {
            config,
            config_path: path.to_path_buf(),
        })
    }

    /// Write the configuration back to disk
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(&self.config)
            .context("Failed to serialize configuration")?;
        write_private_file(&self.config_path, content.as_bytes()).with_context(|| {
            format!("Failed to write config file: {}", self.config_path.display())
        })?;
        Ok(())
    }

    /// Get the loaded configuration
    pub fn config(&self) -> &MuxConfig {
        &self.config
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.config.providers.get(name)
    }

    /// Insert or replace a provider entry; returns the previous entry
    pub fn upsert_provider(
        &mut self,
        name: &str,
        config: ProviderConfig,
    ) -> Option<ProviderConfig> {
        self.config.providers.insert(name.to_string(), config)
    }

    pub fn remove_provider(&mut self, name: &str) -> Option<ProviderConfig> {
        self.config.providers.shift_remove(name)
    }

    pub fn active_provider(&self) -> Option<&str> {
        self.config.active_provider.as_deref()
    }

    pub fn set_active_provider(&mut self, name: Option<&str>) {
        self.config.active_provider = name.map(str::to_string);
    }

    pub fn credential_settings(&self) -> &CredentialSettings {
        &self.config.credentials
    }
}
