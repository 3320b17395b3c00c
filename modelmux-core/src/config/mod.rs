//! modelmux Configuration Module
//!
//! Loads and persists `config.toml`: per-provider settings under
//! `[providers.<name>]`, secret storage settings under `[credentials]`, and any
//! sections owned by other subsystems, which are carried through untouched.

pub mod constants;
pub mod loader;
pub mod provider;

pub use loader::{ConfigManager, MuxConfig};
pub use provider::{CredentialSettings, ProviderConfig};
