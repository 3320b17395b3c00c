//! Provider failure rendering
//!
//! `describe_failure` produces the plain strings handed back to hosts; the
//! `style_*`/`format_*` helpers add console colors for terminal output.

use crate::llm::provider::ProviderError;
use console::style;

/// Categorized, human readable failure description: `<provider> <category>: <detail>`
pub fn describe_failure(provider: &str, error: &ProviderError) -> String {
    format!("{} {}: {}", provider, error.category().label(), error)
}

pub fn style_llm_error(message: &str) -> String {
    style(message).red().to_string()
}

pub fn style_llm_warning(message: &str) -> String {
    style(message).yellow().to_string()
}

pub fn style_llm_success(message: &str) -> String {
    style(message).green().to_string()
}

/// Color a backend kind or provider name
pub fn style_provider_name(provider: &str) -> String {
    let styled_name = match provider.to_lowercase().as_str() {
        "gemini" => style(provider).blue(),
        "openai" => style(provider).yellow(),
        "anthropic" => style(provider).magenta(),
        _ => style(provider).cyan(),
    };
    styled_name.to_string()
}

pub fn format_llm_error(provider: &str, error: &str) -> String {
    format!(
        "{} {}",
        style_provider_name(provider),
        style_llm_error(error)
    )
}

pub fn format_llm_success(provider: &str, message: &str) -> String {
    format!(
        "{} {}",
        style_provider_name(provider),
        style_llm_success(message)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_failure_names_provider_and_category() {
        let message = describe_failure(
            "MyClaude",
            &ProviderError::Authentication("HTTP 401: invalid x-api-key".into()),
        );
        assert_eq!(
            message,
            "MyClaude authentication failed: Authentication failed: HTTP 401: invalid x-api-key"
        );
    }

    #[test]
    fn timeouts_are_connectivity_failures() {
        let message = describe_failure("Fast", &ProviderError::Timeout(30));
        assert!(message.starts_with("Fast connection failed"));
    }

    #[test]
    fn styled_output_keeps_text() {
        let result = format_llm_error("gemini", "Connection failed");
        assert!(result.contains("gemini"));
        assert!(result.contains("Connection failed"));
        assert!(format_llm_success("openai", "ok").contains("ok"));
        assert!(!style_llm_warning("careful").is_empty());
    }
}
