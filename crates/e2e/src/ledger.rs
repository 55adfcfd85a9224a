//! Per-session latency ledger
//!
//! Holds the latest latency sample per channel. A clone shares the same
//! samples, so the classifier pump and the assertion path can each hold a
//! handle. Build a new ledger for every session; never reuse one across runs.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;

/// Latest latency sample per channel, in milliseconds
#[derive(Debug, Clone, Default)]
pub struct LatencyLedger {
    samples: Arc<RwLock<HashMap<String, f64>>>,
}

impl LatencyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the sample for `channel`
    pub(crate) fn record(&self, channel: &str, latency_ms: f64) {
        self.samples.write().insert(channel.to_string(), latency_ms);
    }

    /// Latest sample for `channel`, or 0 when nothing was observed.
    ///
    /// 0 is also what an observed-but-unmeasured response records; use
    /// [`LatencyLedger::sample`] when the difference matters.
    pub fn get(&self, channel: &str) -> f64 {
        self.sample(channel).unwrap_or(0.0)
    }

    /// Latest sample for `channel`, `None` if never observed
    pub fn sample(&self, channel: &str) -> Option<f64> {
        self.samples.read().get(channel).copied()
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.samples.read().contains_key(channel)
    }

    /// Point-in-time copy of every sample, ordered by channel
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.samples
            .read()
            .iter()
            .map(|(channel, ms)| (channel.clone(), *ms))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.samples.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.read().is_empty()
    }
}
