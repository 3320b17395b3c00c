/// Model ID constants shared by the adapters and the CLI
pub mod models {
    // Anthropic models
    pub mod anthropic {
        pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
        pub const SUPPORTED_MODELS: &[&str] = &[
            "claude-opus-4-1-20250805",
            "claude-opus-4-20250514",
            "claude-sonnet-4-20250514",
            "claude-3-7-sonnet-20250219",
            "claude-3-5-haiku-20241022",
            "claude-opus-4-1",
            "claude-opus-4-0",
            "claude-sonnet-4-0",
            "claude-3-7-sonnet-latest",
        ];

        /// Models that accept the extended thinking block, dated ids and their aliases
        pub const THINKING_MODELS: &[&str] = &[
            CLAUDE_OPUS_4_1_20250805,
            CLAUDE_OPUS_4_20250514,
            CLAUDE_SONNET_4_20250514,
            CLAUDE_3_7_SONNET_20250219,
            CLAUDE_OPUS_4_1,
            CLAUDE_OPUS_4_0,
            CLAUDE_SONNET_4_0,
            CLAUDE_3_7_SONNET_LATEST,
        ];

        pub const CLAUDE_OPUS_4_1_20250805: &str = "claude-opus-4-1-20250805";
        pub const CLAUDE_OPUS_4_20250514: &str = "claude-opus-4-20250514";
        pub const CLAUDE_SONNET_4_20250514: &str = "claude-sonnet-4-20250514";
        pub const CLAUDE_3_7_SONNET_20250219: &str = "claude-3-7-sonnet-20250219";
        pub const CLAUDE_3_5_HAIKU_20241022: &str = "claude-3-5-haiku-20241022";

        // Aliases that track the latest snapshot
        pub const CLAUDE_OPUS_4_1: &str = "claude-opus-4-1";
        pub const CLAUDE_OPUS_4_0: &str = "claude-opus-4-0";
        pub const CLAUDE_SONNET_4_0: &str = "claude-sonnet-4-0";
        pub const CLAUDE_3_7_SONNET_LATEST: &str = "claude-3-7-sonnet-latest";
    }

    // OpenAI models
    pub mod openai {
        pub const DEFAULT_MODEL: &str = "gpt-4.1";
        pub const SUPPORTED_MODELS: &[&str] = &[
            "gpt-4.1",
            "gpt-4.1-mini",
            "gpt-4o",
            "gpt-5",
            "gpt-5-mini",
            "o3",
            "o4-mini",
        ];

        /// Models that support the OpenAI reasoning API extensions
        pub const REASONING_MODELS: &[&str] = &[GPT_5, GPT_5_MINI, O3, O4_MINI];

        pub const GPT_4_1: &str = "gpt-4.1";
        pub const GPT_4_1_MINI: &str = "gpt-4.1-mini";
        pub const GPT_4O: &str = "gpt-4o";
        pub const GPT_5: &str = "gpt-5";
        pub const GPT_5_MINI: &str = "gpt-5-mini";
        pub const O3: &str = "o3";
        pub const O4_MINI: &str = "o4-mini";
    }

    // Google/Gemini models
    pub mod google {
        pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
        pub const SUPPORTED_MODELS: &[&str] = &[
            "gemini-2.5-pro",
            "gemini-2.5-flash",
            "gemini-2.5-flash-lite",
            "gemini-2.0-flash",
        ];

        /// Models that can emit thought summaries
        pub const THINKING_MODELS: &[&str] =
            &[GEMINI_2_5_PRO, GEMINI_2_5_FLASH, GEMINI_2_5_FLASH_LITE];

        pub const GEMINI_2_5_PRO: &str = "gemini-2.5-pro";
        pub const GEMINI_2_5_FLASH: &str = "gemini-2.5-flash";
        pub const GEMINI_2_5_FLASH_LITE: &str = "gemini-2.5-flash-lite";
        pub const GEMINI_2_0_FLASH: &str = "gemini-2.0-flash";
    }
}

/// Default configuration values
pub mod defaults {
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
    pub const DEFAULT_MAX_TOKENS: u32 = 4_096;
    pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
    pub const DEFAULT_MIN_REQUEST_INTERVAL_MS: u64 = 500;
    pub const MAX_HISTORY_MESSAGES: usize = 20;

    /// Smallest thinking budget Anthropic accepts
    pub const ANTHROPIC_MIN_THINKING_BUDGET: u32 = 1_024;

    /// Token budget used by connection probes
    pub const PROBE_MAX_TOKENS: u32 = 1;
    pub const PROBE_PROMPT: &str = "ping";
}

/// Message role constants to avoid hardcoding strings
pub mod message_roles {
    pub const SYSTEM: &str = "system";
    pub const USER: &str = "user";
    pub const ASSISTANT: &str = "assistant";
}

/// URL constants for API endpoints
pub mod urls {
    pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
    pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
    pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
    pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";
}

/// Credential format and storage constants
pub mod credentials {
    pub const ANTHROPIC_KEY_PREFIX: &str = "sk-ant-";
    pub const ANTHROPIC_MIN_KEY_LEN: usize = 24;
    pub const OPENAI_KEY_PREFIX: &str = "sk-";
    pub const OPENAI_MIN_KEY_LEN: usize = 20;
    pub const GEMINI_KEY_PREFIX: &str = "AIza";
    pub const GEMINI_MIN_KEY_LEN: usize = 30;

    pub const SECRETS_FILE_NAME: &str = "credentials.json";
    pub const SALT_FILE_NAME: &str = "credentials.salt";
    pub const SALT_LEN: usize = 16;
    pub const NONCE_LEN: usize = 12;
    pub const KEY_LEN: usize = 32;

    /// Argon2id passes over memory
    pub const KDF_TIME_COST: u32 = 3;
    /// Argon2id memory cost in KiB
    pub const KDF_MEMORY_KIB: u32 = 19 * 1024;
    pub const KDF_PARALLELISM: u32 = 1;

    pub const MACHINE_ID_PATHS: &[&str] = &["/etc/machine-id", "/var/lib/dbus/machine-id"];
}

/// On-disk layout of the data directory
pub mod paths {
    pub const APP_DIR_NAME: &str = "modelmux";
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

/// Model validation and helper functions
pub mod model_helpers {
    use super::models;

    /// Get supported models for a provider
    pub fn supported_for(provider: &str) -> Option<&'static [&'static str]> {
        match provider {
            "google" | "gemini" => Some(models::google::SUPPORTED_MODELS),
            "openai" => Some(models::openai::SUPPORTED_MODELS),
            "anthropic" => Some(models::anthropic::SUPPORTED_MODELS),
            _ => None,
        }
    }

    /// Get default model for a provider
    pub fn default_for(provider: &str) -> Option<&'static str> {
        match provider {
            "google" | "gemini" => Some(models::google::DEFAULT_MODEL),
            "openai" => Some(models::openai::DEFAULT_MODEL),
            "anthropic" => Some(models::anthropic::DEFAULT_MODEL),
            _ => None,
        }
    }

    /// Models allowed to run with thinking mode enabled
    pub fn thinking_models_for(provider: &str) -> &'static [&'static str] {
        match provider {
            "google" | "gemini" => models::google::THINKING_MODELS,
            "openai" => models::openai::REASONING_MODELS,
            "anthropic" => models::anthropic::THINKING_MODELS,
            _ => &[],
        }
    }

    /// Validate if a model is supported by a provider
    pub fn is_valid(provider: &str, model: &str) -> bool {
        supported_for(provider)
            .map(|list| list.iter().any(|m| *m == model))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::model_helpers;

    #[test]
    fn thinking_models_are_supported_models() {
        for provider in ["anthropic", "openai", "gemini"] {
            for model in model_helpers::thinking_models_for(provider) {
                assert!(model_helpers::is_valid(provider, model), "{provider}/{model}");
            }
        }
    }

    #[test]
    fn defaults_resolve_for_known_providers() {
        assert!(model_helpers::default_for("anthropic").is_some());
        assert!(model_helpers::default_for("google").is_some());
        assert!(model_helpers::default_for("xai").is_none());
    }
}
