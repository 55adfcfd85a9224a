//! netprobe E2E Observation Harness
//!
//! This crate watches the network traffic of a browser-driven application and
//! enforces policy on it without relying on UI timing:
//! - Classifies response events into named latency channels
//! - Keeps the latest latency per channel in a per-session ledger
//! - Checks channels against latency budgets
//! - Validates captured payloads and checks their provider against a whitelist
//! - Drives Playwright from declarative YAML scenarios
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ProbeRunner (Rust)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PlaywrightHandle ── JSON lines ──▶ mpsc<HostEvent>         │
//! │                                        │                    │
//! │  ObservationSession                    ▼                    │
//! │    ├── EventClassifier  (first matching rule wins)          │
//! │    ├── LatencyLedger    (latest sample per channel)         │
//! │    └── captures         (latest payload per contract)       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  after the stream closes                                    │
//! │    ├── SlaChecker::check_all(budgets)                       │
//! │    └── ContractCheck::evaluate ─▶ validate ─▶ policy        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod contract;
pub mod error;
pub mod event;
pub mod ledger;
pub mod observer;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod session;
pub mod sla;

pub use contract::{enforce, ContractCheck, ContractOutcome};
pub use error::{E2eError, E2eResult, SlaViolation};
pub use event::{CapturedPayload, HostEvent, ResponseEvent};
pub use ledger::LatencyLedger;
pub use observer::{Classification, EventClassifier, ObservationRule};
pub use runner::{observe_events, ProbeRunner, ProbeSuiteResult, ScenarioResult};
pub use scenario::{DriveStep, Scenario};
pub use session::{ObservationSession, SessionHandle, SessionReport};
pub use sla::{BudgetOutcome, SlaBudget, SlaChecker};
