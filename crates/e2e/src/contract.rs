//! Contract enforcement for captured payloads
//!
//! Validation comes first; only a validated entity is handed to the policy.

use netprobe_common::{validate, AuthorizationPolicy, Provider, ValidatedEntity};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{E2eError, E2eResult};
use crate::event::CapturedPayload;

/// A payload contract declared by a scenario
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractCheck {
    /// Capture the body of the latest response whose URL contains this
    pub url_contains: String,

    /// Also require the provider to be authorized
    #[serde(default = "default_require_authorized")]
    pub require_authorized: bool,
}

fn default_require_authorized() -> bool {
    true
}

/// Result of one contract check, for reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractOutcome {
    pub url_contains: String,
    pub passed: bool,
    pub provider: Option<Provider>,
    pub authorized: Option<bool>,
    pub error: Option<String>,
}

/// Validate `payload` and, if asked, check its provider against `policy`
pub fn enforce(
    payload: &CapturedPayload,
    policy: &AuthorizationPolicy,
    require_authorized: bool,
) -> E2eResult<ValidatedEntity> {
    let entity = validate(&payload.body)?;
    if require_authorized && !policy.is_authorized(&entity) {
        return Err(E2eError::Unauthorized {
            url: payload.url.clone(),
            provider: entity.provider(),
        });
    }
    debug!(url = %payload.url, provider = %entity.provider(), "payload satisfied contract");
    Ok(entity)
}

impl ContractCheck {
    /// Evaluate this contract against the capture delivered for it, if any
    pub fn evaluate(
        &self,
        capture: Option<&CapturedPayload>,
        policy: &AuthorizationPolicy,
    ) -> ContractOutcome {
        let result = capture
            .ok_or_else(|| E2eError::MissingCapture(self.url_contains.clone()))
            .and_then(|payload| enforce(payload, policy, self.require_authorized));

        match result {
            Ok(entity) => ContractOutcome {
                url_contains: self.url_contains.clone(),
                passed: true,
                provider: Some(entity.provider()),
                authorized: Some(policy.is_authorized(&entity)),
                error: None,
            },
            Err(e) => {
                warn!(url_contains = %self.url_contains, error = %e, "contract check failed");
                let provider = match &e {
                    E2eError::Unauthorized { provider, .. } => Some(*provider),
                    _ => None,
                };
                ContractOutcome {
                    url_contains: self.url_contains.clone(),
                    passed: false,
                    provider,
                    authorized: provider.map(|_| false),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn capture(body: serde_json::Value) -> CapturedPayload {
        CapturedPayload {
            contract: 0,
            url: "https://app.test/api/images".to_string(),
            body,
        }
    }

    #[test]
    fn test_enforce_accepts_authorized() {
        let entity = enforce(
            &capture(json!({"id": "x", "url": "y", "provider": "openai"})),
            &AuthorizationPolicy::default(),
            true,
        )
        .unwrap();
        assert_eq!(entity.provider(), Provider::OpenAi);
    }

    #[test]
    fn test_enforce_rejects_unauthorized() {
        let err = enforce(
            &capture(json!({"id": "x", "url": "y", "provider": "midjourney"})),
            &AuthorizationPolicy::default(),
            true,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            E2eError::Unauthorized {
                provider: Provider::Midjourney,
                ..
            }
        ));
    }

    #[test]
    fn test_enforce_schema_first() {
        let err = enforce(
            &capture(json!({"id": "x", "provider": "midjourney"})),
            &AuthorizationPolicy::default(),
            true,
        )
        .unwrap_err();
        match err {
            E2eError::Schema(violation) => assert_eq!(violation.field, "url"),
            other => panic!("expected schema violation, got {:?}", other),
        }
    }

    #[test]
    fn test_evaluate_outcomes() {
        let check = ContractCheck {
            url_contains: "/api/images".to_string(),
            require_authorized: false,
        };
        let policy = AuthorizationPolicy::default();

        let outcome = check.evaluate(
            Some(&capture(json!({"id": "x", "url": "y", "provider": "midjourney"}))),
            &policy,
        );
        assert!(outcome.passed);
        assert_eq!(outcome.authorized, Some(false));

        let missing = check.evaluate(None, &policy);
        assert!(!missing.passed);
        assert!(missing.error.unwrap().contains("No payload captured"));
    }

    #[test]
    fn test_require_authorized_defaults_on() {
        let check: ContractCheck = serde_yaml::from_str("url_contains: /api/images").unwrap();
        assert!(check.require_authorized);
    }
}
