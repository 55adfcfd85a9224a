//! Events delivered by the browser driver
//!
//! The driver script prints one JSON object per line on stdout. Each line is
//! tagged with an `event` field:
//!
//! ```text
//! {"event":"response","url":"https://app/api/chat","status":200,"timing_ms":412.7}
//! {"event":"payload","contract":0,"url":"https://app/api/images","body":{...}}
//! {"event":"done","success":true}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A network response observed by the browser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEvent {
    /// Target URL of the request
    pub url: String,

    /// HTTP status, when the driver reports one
    #[serde(default)]
    pub status: Option<u16>,

    /// Request start to response end, in milliseconds
    #[serde(default)]
    pub timing_ms: Option<f64>,
}

impl ResponseEvent {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: None,
            timing_ms: None,
        }
    }

    pub fn with_timing(mut self, timing_ms: f64) -> Self {
        self.timing_ms = Some(timing_ms);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Latency to record for this response.
    ///
    /// Playwright reports `-1` for phases it could not time; that and a
    /// missing value both count as observed-but-unmeasured and yield 0.
    pub fn latency_ms(&self) -> f64 {
        match self.timing_ms {
            Some(ms) if ms.is_finite() && ms >= 0.0 => ms,
            _ => 0.0,
        }
    }
}

/// A JSON body captured for a contract check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedPayload {
    /// Index of the contract in the scenario that asked for this capture
    pub contract: usize,
    pub url: String,
    pub body: Value,
}

/// Anything the driver can report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    Response(ResponseEvent),
    Payload(CapturedPayload),
    Done {
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
}

/// A response line read without its timing
#[derive(Deserialize)]
struct UntimedResponse {
    event: String,
    url: String,
    #[serde(default)]
    status: Option<u16>,
}

/// Parse one line of driver output. Lines that are not events yield `None`.
///
/// A response whose timing cannot be read as a number (for example one out of
/// `f64` range) is still a match, reported without timing.
pub fn parse_host_event(line: &str) -> Option<HostEvent> {
    let line = line.trim();
    if !line.starts_with('{') {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(_) => {
            let untimed: UntimedResponse = serde_json::from_str(line).ok()?;
            if untimed.event != "response" {
                return None;
            }
            Some(HostEvent::Response(ResponseEvent {
                url: untimed.url,
                status: untimed.status,
                timing_ms: None,
            }))
        }
    }
}
