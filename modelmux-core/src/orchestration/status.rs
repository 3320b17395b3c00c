use crate::llm::provider::ProviderResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Connectivity state of one registered provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderState {
    Unknown,
    Initialized,
    Testing,
    Connected,
    Error,
}

impl ProviderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderState::Unknown => "unknown",
            ProviderState::Initialized => "initialized",
            ProviderState::Testing => "testing",
            ProviderState::Connected => "connected",
            ProviderState::Error => "error",
        }
    }

    /// unknown → initialized → testing → {connected, error}; a new probe may
    /// re-enter testing from any settled state
    pub fn can_transition_to(&self, next: ProviderState) -> bool {
        use ProviderState::*;
        matches!(
            (self, next),
            (Unknown, Initialized)
                | (Initialized | Connected | Error, Testing)
                | (Testing, Connected | Error)
        )
    }

    /// States in which the provider is usable for sends
    pub fn is_available(&self) -> bool {
        matches!(self, ProviderState::Initialized | ProviderState::Connected)
    }
}

impl fmt::Display for ProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid status transition for '{provider}': {from} -> {to}")]
pub struct InvalidTransition {
    pub provider: String,
    pub from: ProviderState,
    pub to: ProviderState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusRecord {
    pub provider_name: String,
    pub state: ProviderState,
    pub message: String,
    pub last_checked: DateTime<Utc>,
}

impl StatusRecord {
    pub fn new(provider_name: impl Into<String>) -> Self {
        Self {
            provider_name: provider_name.into(),
            state: ProviderState::Unknown,
            message: String::new(),
            last_checked: Utc::now(),
        }
    }

    /// Move to `next`, rejecting transitions outside the state machine
    pub fn transition(
        &mut self,
        next: ProviderState,
        message: impl Into<String>,
    ) -> Result<(), InvalidTransition> {
        if !self.state.can_transition_to(next) {
            return Err(InvalidTransition {
                provider: self.provider_name.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        self.message = message.into();
        self.last_checked = Utc::now();
        Ok(())
    }
}

/// Per-provider call counters kept by the orchestration service
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallStats {
    pub requests: u64,
    pub failures: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub last_latency_ms: Option<u64>,
    pub last_called: Option<DateTime<Utc>>,
}

impl CallStats {
    pub fn record_success(&mut self, response: &ProviderResponse, latency_ms: u64) {
        self.requests += 1;
        if let Some(usage) = response.usage {
            self.prompt_tokens += u64::from(usage.prompt_tokens);
            self.completion_tokens += u64::from(usage.completion_tokens);
        }
        self.last_latency_ms = Some(latency_ms);
        self.last_called = Some(Utc::now());
    }

    pub fn record_failure(&mut self, latency_ms: u64) {
        self.requests += 1;
        self.failures += 1;
        self.last_latency_ms = Some(latency_ms);
        self.last_called = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ProviderState::*;

    #[test]
    fn follows_the_probe_cycle() {
        let mut record = StatusRecord::new("p");
        record.transition(Initialized, "ready").unwrap();
        record.transition(Testing, "probing").unwrap();
        record.transition(Error, "HTTP 401").unwrap();
        record.transition(Testing, "probing").unwrap();
        record.transition(Connected, "ok").unwrap();
        record.transition(Testing, "probing").unwrap();
        assert_eq!(record.state, Testing);
    }

    #[test]
    fn rejects_shortcuts() {
        let mut record = StatusRecord::new("p");
        let err = record.transition(Connected, "skip").unwrap_err();
        assert_eq!(err.from, Unknown);
        assert_eq!(record.state, Unknown);

        record.transition(Initialized, "").unwrap();
        assert!(record.transition(Connected, "").is_err());
        assert!(record.transition(Unknown, "").is_err());
        assert!(record.transition(Initialized, "").is_err());
    }

    #[test]
    fn every_state_pair_is_classified() {
        let all = [Unknown, Initialized, Testing, Connected, Error];
        let allowed: usize = all
            .iter()
            .map(|from| all.iter().filter(|to| from.can_transition_to(**to)).count())
            .sum();
        assert_eq!(allowed, 6);
    }

    #[test]
    fn stats_accumulate_usage() {
        let mut stats = CallStats::default();
        let response = ProviderResponse {
            content: "hi".into(),
            reasoning: None,
            usage: Some(crate::llm::provider::Usage {
                prompt_tokens: 3,
                completion_tokens: 4,
                total_tokens: 7,
            }),
            model: "m".into(),
            metadata: Default::default(),
        };
        stats.record_success(&response, 12);
        stats.record_failure(40);
        assert_eq!(stats.requests, 2);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.prompt_tokens, 3);
        assert_eq!(stats.completion_tokens, 4);
        assert_eq!(stats.last_latency_ms, Some(40));
    }
}
