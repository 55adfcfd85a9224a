//! Declarative YAML probe scenarios

use std::collections::HashSet;
use std::path::Path;

use netprobe_common::AuthorizationPolicy;
use serde::{Deserialize, Serialize};

use crate::contract::ContractCheck;
use crate::error::{E2eError, E2eResult};
use crate::observer::{EventClassifier, ObservationRule};
use crate::sla::SlaBudget;

/// A complete probe scenario parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering scenarios
    #[serde(default)]
    pub tags: Vec<String>,

    /// Viewport size for the browser
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Interaction that produces the observed traffic
    #[serde(default)]
    pub steps: Vec<DriveStep>,

    /// Observation rules, in priority order
    #[serde(default)]
    pub observe: Vec<ObservationRule>,

    /// Latency budgets checked after the interaction completes
    #[serde(default)]
    pub budgets: Vec<SlaBudget>,

    /// Payload contracts checked after the interaction completes
    #[serde(default)]
    pub contracts: Vec<ContractCheck>,

    /// Overrides the default authorized-provider set
    #[serde(default)]
    pub authorized_providers: Option<AuthorizationPolicy>,
}

fn default_viewport() -> Viewport {
    Viewport {
        width: 1280,
        height: 720,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// One driving step, rendered into the browser script
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DriveStep {
    /// Navigate to a URL (relative to base)
    Navigate {
        url: String,
        #[serde(default)]
        wait_for_selector: Option<String>,
    },

    /// Click an element
    Click {
        selector: String,
        #[serde(default)]
        timeout_ms: Option<u64>,
    },

    /// Fill an input field
    Fill { selector: String, value: String },

    /// Press a key
    Press {
        #[serde(default)]
        selector: Option<String>,
        key: String,
    },

    /// Wait for an element to reach a state
    Wait {
        selector: String,
        #[serde(default = "default_wait_timeout")]
        timeout_ms: u64,
        #[serde(default)]
        state: WaitState,
    },

    /// Wait until a response whose URL contains `url_contains` arrives
    WaitForResponse {
        url_contains: String,
        #[serde(default = "default_response_timeout")]
        timeout_ms: u64,
    },

    /// Wait for a fixed amount of time (use sparingly)
    Sleep { ms: u64 },
}

fn default_wait_timeout() -> u64 {
    5000
}

fn default_response_timeout() -> u64 {
    60000 // image generation is slow
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

impl WaitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitState::Visible => "visible",
            WaitState::Hidden => "hidden",
            WaitState::Attached => "attached",
            WaitState::Detached => "detached",
        }
    }
}

impl Scenario {
    /// Parse a scenario from a YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        let scenario: Self = serde_yaml::from_str(yaml)?;
        scenario.check()?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, recursively
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        Ok(scenarios)
    }

    /// Filter scenarios by tag
    pub fn filter_by_tag<'a>(scenarios: &'a [Self], tag: &str) -> Vec<&'a Self> {
        scenarios
            .iter()
            .filter(|s| s.tags.iter().any(|t| t == tag))
            .collect()
    }

    /// Build the classifier for this scenario's rules
    pub fn classifier(&self) -> E2eResult<EventClassifier> {
        EventClassifier::from_rules(&self.observe)
    }

    pub fn policy(&self) -> AuthorizationPolicy {
        self.authorized_providers.clone().unwrap_or_default()
    }

    /// Reject malformed rules and budgets on channels no rule can ever write
    fn check(&self) -> E2eResult<()> {
        self.classifier()?;

        let channels: HashSet<&str> = self.observe.iter().map(|r| r.channel.as_str()).collect();
        for budget in &self.budgets {
            if !channels.contains(budget.channel.as_str()) {
                return Err(E2eError::ScenarioParse(format!(
                    "scenario '{}' budgets channel '{}' but no rule observes it",
                    self.name, budget.channel
                )));
            }
            if !budget.max_ms.is_finite() || budget.max_ms < 0.0 {
                return Err(E2eError::ScenarioParse(format!(
                    "scenario '{}' has an invalid budget for '{}'",
                    self.name, budget.channel
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netprobe_common::Provider;

    const CHAT_AND_IMAGE: &str = r#"
name: chat-and-image
description: Send a prompt, then generate an image
tags:
  - smoke
  - latency
steps:
  - action: navigate
    url: /chat
    wait_for_selector: '[data-testid="chat-input"]'
  - action: fill
    selector: '[data-testid="chat-input"]'
    value: hello
  - action: press
    key: Enter
  - action: wait_for_response
    url_contains: /api/chat
observe:
  - url_contains: /api/chat
    channel: chat_latency
  - url_pattern: '/api/images(/|$)'
    channel: image_generation_latency
budgets:
  - channel: chat_latency
    max_ms: 3000
contracts:
  - url_contains: /api/images
authorized_providers:
  - openai
"#;

    #[test]
    fn test_parse_scenario() {
        let scenario = Scenario::from_yaml(CHAT_AND_IMAGE).unwrap();
        assert_eq!(scenario.name, "chat-and-image");
        assert_eq!(scenario.steps.len(), 4);
        assert_eq!(scenario.observe.len(), 2);
        assert_eq!(scenario.budgets[0].max_ms, 3000.0);
        assert!(scenario.contracts[0].require_authorized);
        assert_eq!(scenario.policy().authorized(), &[Provider::OpenAi]);
        assert_eq!(scenario.viewport.width, 1280);

        let classifier = scenario.classifier().unwrap();
        assert_eq!(
            classifier.classify("https://app.test/api/images/"),
            Some("image_generation_latency")
        );
    }

    #[test]
    fn test_default_policy_when_not_overridden() {
        let scenario = Scenario::from_yaml("name: bare\n").unwrap();
        assert_eq!(scenario.policy(), AuthorizationPolicy::default());
        assert!(scenario.steps.is_empty());
    }

    #[test]
    fn test_budget_for_unobserved_channel_is_rejected() {
        let yaml = r#"
name: broken
budgets:
  - channel: chat_latency
    max_ms: 100
"#;
        assert!(matches!(Scenario::from_yaml(yaml), Err(E2eError::ScenarioParse(_))));
    }

    #[test]
    fn test_bad_rule_fails_at_load() {
        let bad_pattern = r#"
name: broken
observe:
  - url_pattern: '('
    channel: chat_latency
"#;
        assert!(matches!(Scenario::from_yaml(bad_pattern), Err(E2eError::Regex(_))));

        let both = r#"
name: broken
observe:
  - url_contains: /api/chat
    url_pattern: '/api/chat$'
    channel: chat_latency
"#;
        assert!(matches!(Scenario::from_yaml(both), Err(E2eError::InvalidRule(_))));
    }

    #[test]
    fn test_unknown_provider_in_override_is_rejected() {
        let yaml = r#"
name: broken
authorized_providers: [dall-e]
"#;
        assert!(matches!(Scenario::from_yaml(yaml), Err(E2eError::Yaml(_))));
    }

    #[test]
    fn test_filter_by_tag() {
        let tagged = Scenario::from_yaml(CHAT_AND_IMAGE).unwrap();
        let bare = Scenario::from_yaml("name: bare\n").unwrap();
        let all = vec![tagged, bare];
        let smoke = Scenario::filter_by_tag(&all, "smoke");
        assert_eq!(smoke.len(), 1);
        assert_eq!(smoke[0].name, "chat-and-image");
    }
}
