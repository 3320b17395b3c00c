//! # modelmux-core - provider orchestration runtime
//!
//! `modelmux-core` keeps several interchangeable AI backends behind one
//! contract, stores their secrets safely, and tracks whether each one is
//! reachable.
//!
//! ## Highlights
//!
//! - **Provider Abstraction**: one adapter trait over the Anthropic Messages,
//!   OpenAI Chat Completions and Gemini generateContent APIs, selected through
//!   a closed [`BackendKind`] enum.
//! - **Secret Storage**: credentials are sealed with AES-256-GCM under an
//!   Argon2id key bound to the machine; installs without a usable machine
//!   identity fall back to plaintext with a one-time warning.
//! - **Connection State**: every provider carries a status record that only
//!   moves along `unknown → initialized → testing → connected | error`, with
//!   subscribers notified on each change.
//! - **Blocking Facade**: [`OrchestrationService`] owns a current-thread
//!   Tokio runtime so synchronous hosts can call everything directly.
//! - **Configuration-First**: provider settings live in `config.toml`; model
//!   catalogs, endpoints and limits are centralized in `config::constants`.
//!
//! ## Architecture Overview
//!
//! - `config/`: configuration loader, provider settings, and constants.
//! - `credentials/`: secret store, cipher, and key format checks.
//! - `llm/`: adapter contract, backend adapters, factory, and registry.
//! - `orchestration/`: the service facade, status machine, and event fan-out.
//! - `utils/`: owner-only atomic file writes.
//!
//! ## Quickstart
//!
//! ```rust,no_run
//! use modelmux_core::{OrchestrationService, ProviderConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut service = OrchestrationService::open_default()?;
//!     service.initialize_from_store();
//!
//!     if service.add_provider("Fast", "AIza...", ProviderConfig::with_model("gemini-2.5-flash")) {
//!         let reply = service.send_message_to_provider(Some("Fast"), "Hello!", None);
//!         println!("{reply}");
//!     }
//!
//!     service.shutdown();
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod credentials;
pub mod llm;
pub mod orchestration;
pub mod utils;

// Re-exports for convenience
pub use config::{ConfigManager, CredentialSettings, MuxConfig, ProviderConfig};
pub use credentials::{CredentialError, CredentialStore, StoreOutcome};
pub use llm::{
    BackendKind, ConversationMessage, ProviderAdapter, ProviderError, ProviderRegistry,
    ProviderResponse,
};
pub use orchestration::{
    OrchestrationService, ProviderEvent, ProviderState, ProviderSummary, StatusRecord,
};
