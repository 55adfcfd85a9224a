//! Latency budget checks against the ledger
//!
//! Checks read whatever the ledger holds right now and never wait. Run them
//! only after the interaction that triggers the response has completed,
//! otherwise a missing sample reads as 0 and passes.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SlaViolation;
use crate::ledger::LatencyLedger;

/// A latency budget for one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlaBudget {
    pub channel: String,
    pub max_ms: f64,
}

impl SlaBudget {
    pub fn new(channel: impl Into<String>, max_ms: f64) -> Self {
        Self {
            channel: channel.into(),
            max_ms,
        }
    }
}

/// Result of checking one budget, for reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetOutcome {
    pub channel: String,
    pub budget_ms: f64,
    /// `None` when no matching response was ever observed
    pub observed_ms: Option<f64>,
    pub passed: bool,
    pub violation: Option<String>,
}

/// Reads the ledger and enforces budgets
#[derive(Debug, Clone)]
pub struct SlaChecker {
    ledger: LatencyLedger,
}

impl SlaChecker {
    pub fn new(ledger: LatencyLedger) -> Self {
        Self { ledger }
    }

    /// Fail if `channel`'s latest latency is above `max_ms`. Equal passes.
    ///
    /// A NaN budget cannot be met and always fails.
    pub fn assert_within_budget(&self, channel: &str, max_ms: f64) -> Result<(), SlaViolation> {
        let observed_ms = self.ledger.get(channel);
        if let Some(Ordering::Greater) | None = observed_ms.partial_cmp(&max_ms) {
            return Err(SlaViolation {
                channel: channel.to_string(),
                observed_ms,
                budget_ms: max_ms,
            });
        }
        debug!(channel, observed_ms, budget_ms = max_ms, "latency within budget");
        Ok(())
    }

    pub fn check(&self, budget: &SlaBudget) -> BudgetOutcome {
        let observed_ms = self.ledger.sample(&budget.channel);
        if observed_ms.is_none() {
            warn!(channel = %budget.channel, "no response observed for budgeted channel");
        }

        let verdict = self.assert_within_budget(&budget.channel, budget.max_ms);
        BudgetOutcome {
            channel: budget.channel.clone(),
            budget_ms: budget.max_ms,
            observed_ms,
            passed: verdict.is_ok(),
            violation: verdict.err().map(|v| v.to_string()),
        }
    }

    /// Check every budget, reporting all of them rather than stopping early
    pub fn check_all(&self, budgets: &[SlaBudget]) -> Vec<BudgetOutcome> {
        budgets.iter().map(|budget| self.check(budget)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker_with(channel: &str, ms: f64) -> SlaChecker {
        let ledger = LatencyLedger::new();
        ledger.record(channel, ms);
        SlaChecker::new(ledger)
    }

    #[test]
    fn test_equal_to_budget_passes() {
        let checker = checker_with("chat_latency", 1500.0);
        assert!(checker.assert_within_budget("chat_latency", 1500.0).is_ok());
    }

    #[test]
    fn test_nan_budget_fails() {
        let checker = checker_with("chat_latency", 5000.0);
        let violation = checker.assert_within_budget("chat_latency", f64::NAN).unwrap_err();
        assert_eq!(violation.observed_ms, 5000.0);
        assert!(violation.budget_ms.is_nan());

        let empty = SlaChecker::new(LatencyLedger::new());
        assert!(empty.assert_within_budget("chat_latency", f64::NAN).is_err());
    }

    #[test]
    fn test_over_budget_fails_with_details() {
        let checker = checker_with("chat_latency", 1500.0);
        let violation = checker.assert_within_budget("chat_latency", 1499.0).unwrap_err();
        assert_eq!(violation.channel, "chat_latency");
        assert_eq!(violation.observed_ms, 1500.0);
        assert_eq!(violation.budget_ms, 1499.0);
    }

    #[test]
    fn test_unobserved_channel_passes_any_budget() {
        let checker = SlaChecker::new(LatencyLedger::new());
        assert!(checker.assert_within_budget("image_generation_latency", 0.0).is_ok());
        assert!(checker.assert_within_budget("image_generation_latency", 10.0).is_ok());
    }

    #[test]
    fn test_check_all_reports_every_budget() {
        let checker = checker_with("chat_latency", 2500.0);
        let outcomes = checker.check_all(&[
            SlaBudget::new("chat_latency", 2000.0),
            SlaBudget::new("image_generation_latency", 30000.0),
        ]);

        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].passed);
        assert_eq!(outcomes[0].observed_ms, Some(2500.0));
        assert!(outcomes[0].violation.as_deref().unwrap().contains("exceeds budget of 2000.0 ms"));

        assert!(outcomes[1].passed);
        assert_eq!(outcomes[1].observed_ms, None);
        assert_eq!(outcomes[1].violation, None);
    }
}
