//! One observation session: a fresh ledger and a single attached stream

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::{E2eError, E2eResult, SlaViolation};
use crate::event::{CapturedPayload, HostEvent};
use crate::ledger::LatencyLedger;
use crate::observer::EventClassifier;
use crate::sla::SlaChecker;

/// Counters and captures gathered while the stream was open
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    pub responses: usize,
    pub classified: usize,
    pub unmatched: usize,
    /// Latest captured payload per contract index
    pub captures: BTreeMap<usize, CapturedPayload>,
    /// The driver announced it finished its steps
    pub driver_completed: bool,
    pub driver_error: Option<String>,
}

/// Owns the ledger and classifier for one run
pub struct ObservationSession {
    classifier: Option<EventClassifier>,
    ledger: LatencyLedger,
}

impl ObservationSession {
    /// Start a session with a fresh, empty ledger
    pub fn new(classifier: EventClassifier) -> Self {
        Self {
            classifier: Some(classifier),
            ledger: LatencyLedger::new(),
        }
    }

    pub fn ledger(&self) -> &LatencyLedger {
        &self.ledger
    }

    pub fn sla(&self) -> SlaChecker {
        SlaChecker::new(self.ledger.clone())
    }

    pub fn get_latency(&self, channel: &str) -> f64 {
        self.ledger.get(channel)
    }

    pub fn assert_latency_within(&self, channel: &str, max_ms: f64) -> Result<(), SlaViolation> {
        self.sla().assert_within_budget(channel, max_ms)
    }

    /// Attach the classifier to a response stream.
    ///
    /// Only one stream per session; a second call fails. The pump ends when
    /// every sender is dropped.
    pub fn attach(&mut self, events: mpsc::Receiver<HostEvent>) -> E2eResult<SessionHandle> {
        let classifier = self.classifier.take().ok_or(E2eError::AlreadyAttached)?;
        let ledger = self.ledger.clone();

        info!(rules = classifier.len(), "attached response observer");
        let task = tokio::spawn(pump(classifier, ledger, events));
        Ok(SessionHandle { task })
    }
}

/// Running pump for an attached session
pub struct SessionHandle {
    task: JoinHandle<SessionReport>,
}

impl SessionHandle {
    /// Wait for the stream to close and return what was seen
    pub async fn finished(self) -> E2eResult<SessionReport> {
        self.task
            .await
            .map_err(|e| E2eError::SessionAborted(e.to_string()))
    }
}

async fn pump(
    classifier: EventClassifier,
    ledger: LatencyLedger,
    mut events: mpsc::Receiver<HostEvent>,
) -> SessionReport {
    let mut report = SessionReport::default();

    while let Some(event) = events.recv().await {
        match event {
            HostEvent::Response(response) => {
                report.responses += 1;
                match classifier.dispatch(&response, &ledger) {
                    Some(_) => report.classified += 1,
                    None => report.unmatched += 1,
                }
            }
            HostEvent::Payload(payload) => {
                debug!(contract = payload.contract, url = %payload.url, "captured payload");
                report.captures.insert(payload.contract, payload);
            }
            HostEvent::Done { success, error } => {
                report.driver_completed = true;
                if !success {
                    let reason = error.unwrap_or_else(|| "driver reported failure".to_string());
                    warn!(error = %reason, "driver finished with an error");
                    report.driver_error = Some(reason);
                }
            }
        }
    }

    debug!(
        responses = report.responses,
        classified = report.classified,
        unmatched = report.unmatched,
        "response stream closed"
    );
    report
}
