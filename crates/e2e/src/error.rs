//! Error types for the probe harness

use netprobe_common::{Provider, SchemaViolation};
use thiserror::Error;

/// A channel's latest latency exceeded its budget
#[derive(Error, Debug, Clone, PartialEq)]
#[error("SLA violation on '{channel}': observed {observed_ms:.1} ms exceeds budget of {budget_ms:.1} ms")]
pub struct SlaViolation {
    pub channel: String,
    pub observed_ms: f64,
    pub budget_ms: f64,
}

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Scenario parse error: {0}")]
    ScenarioParse(String),

    #[error("Invalid observation rule: {0}")]
    InvalidRule(String),

    #[error("Event classifier is already attached to a response stream")]
    AlreadyAttached,

    #[error("Observation session aborted: {0}")]
    SessionAborted(String),

    #[error(transparent)]
    Sla(#[from] SlaViolation),

    #[error(transparent)]
    Schema(#[from] SchemaViolation),

    #[error("Provider '{provider}' is not authorized (payload from {url})")]
    Unauthorized { url: String, provider: Provider },

    #[error("No payload captured for responses matching '{0}'")]
    MissingCapture(String),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sla_message_is_readable() {
        let violation = SlaViolation {
            channel: "chat_latency".to_string(),
            observed_ms: 2500.0,
            budget_ms: 2000.0,
        };
        assert_eq!(
            violation.to_string(),
            "SLA violation on 'chat_latency': observed 2500.0 ms exceeds budget of 2000.0 ms"
        );

        let wrapped: E2eError = violation.into();
        assert!(wrapped.to_string().starts_with("SLA violation on 'chat_latency'"));
    }
}
