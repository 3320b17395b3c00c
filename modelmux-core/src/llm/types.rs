use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend kinds compiled into this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Anthropic,
    OpenAI,
    Gemini,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Anthropic,
        BackendKind::OpenAI,
        BackendKind::Gemini,
    ];

    /// Identifier used in config files and constants lookups
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Anthropic => "anthropic",
            BackendKind::OpenAI => "openai",
            BackendKind::Gemini => "gemini",
        }
    }

    /// Human readable vendor name for messages
    pub fn display_name(&self) -> &'static str {
        match self {
            BackendKind::Anthropic => "Anthropic",
            BackendKind::OpenAI => "OpenAI",
            BackendKind::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(BackendKind::Anthropic),
            "openai" | "gpt" => Ok(BackendKind::OpenAI),
            "gemini" | "google" => Ok(BackendKind::Gemini),
            other => Err(format!(
                "Unknown provider type: {other}. Supported: anthropic, openai, gemini"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_case_insensitively() {
        assert_eq!("Claude".parse::<BackendKind>(), Ok(BackendKind::Anthropic));
        assert_eq!(" google ".parse::<BackendKind>(), Ok(BackendKind::Gemini));
        assert_eq!("OPENAI".parse::<BackendKind>(), Ok(BackendKind::OpenAI));
        assert!("xai".parse::<BackendKind>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&BackendKind::OpenAI).unwrap();
        assert_eq!(json, "\"openai\"");
    }
}
