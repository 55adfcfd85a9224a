//! Scenario runner: drives the browser, observes responses, enforces policy

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::contract::ContractOutcome;
use crate::error::{E2eError, E2eResult};
use crate::event::HostEvent;
use crate::playwright::{PlaywrightConfig, PlaywrightHandle};
use crate::scenario::Scenario;
use crate::session::{ObservationSession, SessionReport};
use crate::sla::BudgetOutcome;

/// Buffered events between the driver reader and the observer
const EVENT_BUFFER: usize = 256;

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Latest latency per observed channel
    pub latencies: BTreeMap<String, f64>,
    pub budgets: Vec<BudgetOutcome>,
    pub contracts: Vec<ContractOutcome>,
    pub responses_seen: usize,
    pub responses_unmatched: usize,
    pub error: Option<String>,
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

/// Configuration for the runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub playwright: PlaywrightConfig,
    pub scenarios_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            playwright: PlaywrightConfig::default(),
            scenarios_dir: PathBuf::from("probes"),
            output_dir: PathBuf::from("probe-results"),
        }
    }
}

/// Main probe runner
pub struct ProbeRunner {
    config: RunnerConfig,
}

impl ProbeRunner {
    /// Create a new runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Run every scenario in the scenarios directory
    pub async fn run_all(&self) -> E2eResult<ProbeSuiteResult> {
        let scenarios = Scenario::load_all(&self.config.scenarios_dir)?;
        self.run_scenarios(&scenarios).await
    }

    /// Run scenarios carrying `tag`
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<ProbeSuiteResult> {
        let scenarios = Scenario::load_all(&self.config.scenarios_dir)?;
        let filtered: Vec<Scenario> = Scenario::filter_by_tag(&scenarios, tag)
            .into_iter()
            .cloned()
            .collect();
        self.run_scenarios(&filtered).await
    }

    /// Run a single scenario by name
    pub async fn run_named(&self, name: &str) -> E2eResult<ProbeSuiteResult> {
        let scenarios = Scenario::load_all(&self.config.scenarios_dir)?;
        let scenario = scenarios
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::ScenarioParse(format!("Scenario not found: {}", name)))?;
        self.run_scenarios(std::slice::from_ref(&scenario)).await
    }

    /// Run a list of scenarios one after another
    pub async fn run_scenarios(&self, scenarios: &[Scenario]) -> E2eResult<ProbeSuiteResult> {
        let start = Instant::now();
        let mut results = Vec::new();

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let result = match self.run_scenario(scenario).await {
                Ok(result) => result,
                Err(e) => ScenarioResult::failed(scenario, Utc::now(), e.to_string()),
            };

            if result.success {
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                error!(
                    "✗ {} - {}",
                    result.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }

        let suite = ProbeSuiteResult::from_results(results, start.elapsed().as_millis() as u64);
        info!(
            "Probe results: {} passed, {} failed ({} ms)",
            suite.passed, suite.failed, suite.duration_ms
        );
        Ok(suite)
    }

    /// Run one scenario in a fresh observation session
    pub async fn run_scenario(&self, scenario: &Scenario) -> E2eResult<ScenarioResult> {
        debug!("Running scenario: {}", scenario.name);

        let playwright = PlaywrightHandle::new(self.config.playwright.clone())?;

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let started_at = Utc::now();
        let start = Instant::now();

        let mut session = ObservationSession::new(scenario.classifier()?);
        let handle = session.attach(rx)?;

        let driver = playwright.spawn_session(scenario, tx).await?;
        let driver_result = driver.wait().await;
        let report = handle.finished().await?;

        let mut result = evaluate(scenario, &session, report, started_at);
        if let Err(e) = driver_result {
            if result.error.is_none() {
                result.error = Some(e.to_string());
            }
            result.success = false;
        }
        result.duration_ms = start.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Write results to JSON in the output directory
    pub fn write_results(&self, results: &ProbeSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("probe-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for ProbeRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Observe a ready-made event stream for `scenario` and evaluate it.
///
/// Returns once every sender of `events` is dropped. Useful when responses
/// come from somewhere other than the bundled Playwright driver.
pub async fn observe_events(
    scenario: &Scenario,
    events: mpsc::Receiver<HostEvent>,
) -> E2eResult<ScenarioResult> {
    let started_at = Utc::now();
    let start = Instant::now();

    let mut session = ObservationSession::new(scenario.classifier()?);
    let report = session.attach(events)?.finished().await?;

    let mut result = evaluate(scenario, &session, report, started_at);
    result.duration_ms = start.elapsed().as_millis() as u64;
    Ok(result)
}

/// Check budgets and contracts once the stream has closed
fn evaluate(
    scenario: &Scenario,
    session: &ObservationSession,
    report: SessionReport,
    started_at: DateTime<Utc>,
) -> ScenarioResult {
    let budgets = session.sla().check_all(&scenario.budgets);

    let policy = scenario.policy();
    let contracts: Vec<ContractOutcome> = scenario
        .contracts
        .iter()
        .enumerate()
        .map(|(i, check)| check.evaluate(report.captures.get(&i), &policy))
        .collect();

    let error = report
        .driver_error
        .clone()
        .or_else(|| budgets.iter().find_map(|b| b.violation.clone()))
        .or_else(|| contracts.iter().find_map(|c| c.error.clone()));

    ScenarioResult {
        name: scenario.name.clone(),
        success: error.is_none(),
        started_at,
        duration_ms: 0,
        latencies: session.ledger().snapshot(),
        budgets,
        contracts,
        responses_seen: report.responses,
        responses_unmatched: report.unmatched,
        error,
    }
}

impl ScenarioResult {
    fn failed(scenario: &Scenario, started_at: DateTime<Utc>, error: String) -> Self {
        Self {
            name: scenario.name.clone(),
            success: false,
            started_at,
            duration_ms: 0,
            latencies: BTreeMap::new(),
            budgets: Vec::new(),
            contracts: Vec::new(),
            responses_seen: 0,
            responses_unmatched: 0,
            error: Some(error),
        }
    }
}

impl ProbeSuiteResult {
    pub fn from_results(results: Vec<ScenarioResult>, duration_ms: u64) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            passed,
            failed: results.len() - passed,
            duration_ms,
            results,
        }
    }
}
