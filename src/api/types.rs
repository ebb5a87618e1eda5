//! API request, response and query types.

use serde::{Deserialize, Serialize};

use crate::sim::PolicyMode;
use crate::sim::snapshot::MetricsView;

/// Body of `POST /control/mode`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModeRequest {
    pub mode: PolicyMode,
}

/// Acknowledgement that a control command was queued.
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub accepted: bool,
    pub command: String,
}

impl ControlResponse {
    pub fn accepted(command: impl Into<String>) -> Self {
        Self {
            accepted: true,
            command: command.into(),
        }
    }
}

/// Metrics at the time of the newest snapshot.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub generation: u64,
    pub tick: u64,
    pub clock: String,
    pub mode: PolicyMode,
    pub metrics: MetricsView,
}

/// Optional cap on the number of events returned.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub limit: Option<usize>,
}

/// Error response body for 4xx/5xx errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_request_accepts_both_spellings() {
        let upper: ModeRequest = serde_json::from_str(r#"{"mode":"BASELINE"}"#).unwrap();
        assert_eq!(upper.mode, PolicyMode::Baseline);
        let lower: ModeRequest = serde_json::from_str(r#"{"mode":"adaptive"}"#).unwrap();
        assert_eq!(lower.mode, PolicyMode::Adaptive);
    }

    #[test]
    fn mode_request_rejects_unknown_mode() {
        assert!(serde_json::from_str::<ModeRequest>(r#"{"mode":"TURBO"}"#).is_err());
        assert!(serde_json::from_str::<ModeRequest>(r#"{"policy":"BASELINE"}"#).is_err());
    }
}
