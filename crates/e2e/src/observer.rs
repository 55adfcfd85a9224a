//! Response classification into latency channels
//!
//! Rules are evaluated in registration order and the first match wins, even
//! when a later rule is more specific. Order is part of the configuration.

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{E2eError, E2eResult};
use crate::event::ResponseEvent;
use crate::ledger::LatencyLedger;

/// Configured form of a rule, as written in scenario files.
///
/// Exactly one of `url_contains` and `url_pattern` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationRule {
    /// Channel to record matching responses under
    pub channel: String,

    /// Match when the URL contains this substring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_contains: Option<String>,

    /// Match when the URL matches this regular expression
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_pattern: Option<String>,
}

impl ObservationRule {
    pub fn contains(url_substring: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            url_contains: Some(url_substring.into()),
            url_pattern: None,
        }
    }

    pub fn pattern(pattern: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            url_contains: None,
            url_pattern: Some(pattern.into()),
        }
    }

    fn compile(&self) -> E2eResult<CompiledRule> {
        if self.channel.is_empty() {
            return Err(E2eError::InvalidRule("channel name is empty".to_string()));
        }

        let matcher = match (&self.url_contains, &self.url_pattern) {
            (Some(_), Some(_)) => {
                return Err(E2eError::InvalidRule(format!(
                    "rule for '{}' sets both url_contains and url_pattern",
                    self.channel
                )))
            }
            (None, None) => {
                return Err(E2eError::InvalidRule(format!(
                    "rule for '{}' needs url_contains or url_pattern",
                    self.channel
                )))
            }
            (Some(substring), None) if substring.is_empty() => {
                return Err(E2eError::InvalidRule(format!(
                    "rule for '{}' has an empty url_contains",
                    self.channel
                )))
            }
            (Some(substring), None) => UrlMatcher::Contains(substring.clone()),
            (None, Some(pattern)) => UrlMatcher::Pattern(Regex::new(pattern)?),
        };

        Ok(CompiledRule {
            matcher,
            channel: self.channel.clone(),
        })
    }
}

#[derive(Debug, Clone)]
enum UrlMatcher {
    Contains(String),
    Pattern(Regex),
}

impl UrlMatcher {
    fn matches(&self, url: &str) -> bool {
        match self {
            UrlMatcher::Contains(substring) => url.contains(substring.as_str()),
            UrlMatcher::Pattern(re) => re.is_match(url),
        }
    }
}

#[derive(Debug, Clone)]
struct CompiledRule {
    matcher: UrlMatcher,
    channel: String,
}

/// What the classifier wrote for one event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub channel: String,
    pub latency_ms: f64,
}

/// Ordered set of observation rules
#[derive(Debug, Clone, Default)]
pub struct EventClassifier {
    rules: Vec<CompiledRule>,
}

impl EventClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a classifier from configured rules, keeping their order
    pub fn from_rules(rules: &[ObservationRule]) -> E2eResult<Self> {
        let mut classifier = Self::new();
        for rule in rules {
            classifier.observe(rule)?;
        }
        Ok(classifier)
    }

    /// Register a rule after all previously registered ones
    pub fn observe(&mut self, rule: &ObservationRule) -> E2eResult<&mut Self> {
        let compiled = rule.compile()?;
        debug!(channel = %compiled.channel, position = self.rules.len(), "registered observation rule");
        self.rules.push(compiled);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Channel of the first rule matching `url`
    pub fn classify(&self, url: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(url))
            .map(|rule| rule.channel.as_str())
    }

    /// Classify `event` and record its latency in `ledger`.
    ///
    /// Unmatched events leave the ledger untouched and return `None`.
    pub fn dispatch(&self, event: &ResponseEvent, ledger: &LatencyLedger) -> Option<Classification> {
        let Some(channel) = self.classify(&event.url) else {
            trace!(url = %event.url, "response matched no observation rule");
            return None;
        };

        let latency_ms = event.latency_ms();
        ledger.record(channel, latency_ms);
        debug!(channel, latency_ms, url = %event.url, "classified response");

        Some(Classification {
            channel: channel.to_string(),
            latency_ms,
        })
    }
}
