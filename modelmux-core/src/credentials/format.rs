//! Offline credential heuristics.
//!
//! These checks only look at the shape of a key (prefix and length). A key
//! that passes may still be rejected by the backend.

use crate::config::constants::credentials as rules;
use crate::llm::types::BackendKind;

/// Check whether `secret` looks like a key for `kind`.
pub fn validate_format(kind: BackendKind, secret: &str) -> bool {
    let secret = secret.trim();
    if secret.is_empty() || secret.chars().any(char::is_whitespace) {
        return false;
    }

    match kind {
        BackendKind::Anthropic => {
            secret.starts_with(rules::ANTHROPIC_KEY_PREFIX)
                && secret.len() >= rules::ANTHROPIC_MIN_KEY_LEN
        }
        // Anthropic keys share the `sk-` prefix and are rejected here
        BackendKind::OpenAI => {
            secret.starts_with(rules::OPENAI_KEY_PREFIX)
                && !secret.starts_with(rules::ANTHROPIC_KEY_PREFIX)
                && secret.len() >= rules::OPENAI_MIN_KEY_LEN
        }
        BackendKind::Gemini => {
            secret.starts_with(rules::GEMINI_KEY_PREFIX) && secret.len() >= rules::GEMINI_MIN_KEY_LEN
        }
    }
}

/// Guess the backend a key belongs to from its prefix.
pub fn infer_kind(secret: &str) -> Option<BackendKind> {
    let secret = secret.trim();
    if secret.starts_with(rules::ANTHROPIC_KEY_PREFIX) {
        Some(BackendKind::Anthropic)
    } else if secret.starts_with(rules::GEMINI_KEY_PREFIX) {
        Some(BackendKind::Gemini)
    } else if secret.starts_with(rules::OPENAI_KEY_PREFIX) {
        Some(BackendKind::OpenAI)
    } else {
        None
    }
}
