//! # Provider Adapter Layer
//!
//! One uniform contract ([`ProviderAdapter`]) over the Anthropic Messages,
//! OpenAI Chat Completions and Gemini generateContent APIs, plus the
//! [`ProviderRegistry`] that holds named adapter instances.
//!
//! ## Supported Backends
//!
//! | Backend | Thinking models | Auth |
//! |---------|-----------------|------|
//! | Anthropic | claude-opus-4-1, claude-opus-4-0, claude-sonnet-4-0, claude-3-7-sonnet-latest (and their dated ids) | `x-api-key` |
//! | OpenAI | gpt-5, gpt-5-mini, o3, o4-mini | bearer token |
//! | Gemini | gemini-2.5-pro, gemini-2.5-flash(-lite) | `x-goog-api-key` |
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use modelmux_core::config::ProviderConfig;
//! use modelmux_core::llm::{BackendKind, ProviderRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut registry = ProviderRegistry::new();
//!     registry.add(
//!         "Fast",
//!         BackendKind::Gemini,
//!         std::env::var("GEMINI_API_KEY")?,
//!         ProviderConfig::with_model("gemini-2.5-flash"),
//!     )?;
//!
//!     // No name given: the active provider answers
//!     let reply = registry.dispatch("Hello!", None, None).await;
//!     println!("{reply}");
//!     Ok(())
//! }
//! ```
//!
//! Adapters keep a bounded conversation window, pace their own requests and
//! map HTTP failures onto [`ProviderError`]. Nothing here retries.

pub mod error_display;
pub mod factory;
pub mod history;
pub mod provider;
pub mod providers;
pub mod rate_limiter;
pub mod registry;
pub mod types;

pub use factory::{create_adapter, infer_kind, kind_from_model};
pub use history::ConversationHistory;
pub use provider::{
    ConversationMessage, ErrorCategory, MessageRole, ProviderAdapter, ProviderError,
    ProviderResponse, Usage,
};
pub use registry::{ProviderInstance, ProviderRegistry};
pub use types::BackendKind;
