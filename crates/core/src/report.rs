//! Dispatch and probe report types.
//!
//! A dispatch never fails fast on a per-host error: every issued request
//! produces one [`DispatchOutcome`], and the caller decides how severe a
//! partial failure is. Reports are serializable for machine-readable
//! operator output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Result classification of a single invalidation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchStatus {
    /// Cache layer acknowledged the ban with a 2xx status.
    Banned,
    /// Cache layer answered with a non-success status.
    UpstreamError,
    /// The request never completed (refused, reset, timeout, TLS).
    TransportError,
}

/// Outcome of one invalidation request against one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Target hostname; `None` for the single installation-wide request.
    pub host: Option<String>,

    /// Result classification.
    pub status: DispatchStatus,

    /// HTTP status returned by the cache layer, when it answered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    /// Transport error message (if status is TransportError).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchOutcome {
    /// Whether the cache layer acknowledged this request.
    pub fn succeeded(&self) -> bool {
        self.status == DispatchStatus::Banned
    }

    /// Target label for log lines and operator messages.
    pub fn target(&self) -> &str {
        self.host.as_deref().unwrap_or("installation")
    }
}

/// Summary statistics over a dispatch fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchSummary {
    /// Total number of requests issued.
    pub total: u32,
    /// Number of acknowledged bans.
    pub succeeded: u32,
    /// Number of upstream or transport failures.
    pub failed: u32,
}

/// Aggregate result of one invalidation operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Per-target outcomes, in planning order.
    pub outcomes: Vec<DispatchOutcome>,
    /// Summary statistics.
    pub summary: DispatchSummary,
    /// RFC 3339 timestamp taken when the fan-out started.
    pub started_at: String,
}

impl DispatchReport {
    /// Build a report from outcomes, deriving the summary.
    pub fn new(outcomes: Vec<DispatchOutcome>, started_at: String) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.succeeded()).count() as u32;
        let total = outcomes.len() as u32;
        let summary = DispatchSummary { total, succeeded, failed: total - succeeded };
        Self { outcomes, summary, started_at }
    }

    /// Whether every issued request was acknowledged.
    pub fn all_succeeded(&self) -> bool {
        self.summary.failed == 0
    }
}

/// Result of a cache debug probe against a single URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeReport {
    /// HTTP status returned by the cache layer.
    pub status_code: u16,

    /// Host of the probed URL (original host, not the rewritten authority).
    pub host: String,

    /// The URL as given by the operator.
    pub url: String,

    /// Response headers; when a header repeats per proxy hop, only the
    /// last occurrence is kept.
    pub headers: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn banned(host: &str) -> DispatchOutcome {
        DispatchOutcome {
            host: Some(host.to_string()),
            status: DispatchStatus::Banned,
            status_code: Some(200),
            error: None,
        }
    }

    #[test]
    fn test_report_summary() {
        let outcomes = vec![
            banned("a.example.com"),
            DispatchOutcome {
                host: Some("b.example.com".to_string()),
                status: DispatchStatus::TransportError,
                status_code: None,
                error: Some("connection refused".to_string()),
            },
        ];
        let report = DispatchReport::new(outcomes, "2026-01-01T00:00:00Z".to_string());

        assert_eq!(report.summary.total, 2);
        assert_eq!(report.summary.succeeded, 1);
        assert_eq!(report.summary.failed, 1);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_all_succeeded() {
        let report = DispatchReport::new(vec![banned("a.example.com")], "2026-01-01T00:00:00Z".to_string());
        assert!(report.all_succeeded());
    }

    #[test]
    fn test_target_label() {
        let outcome = DispatchOutcome {
            host: None,
            status: DispatchStatus::Banned,
            status_code: Some(200),
            error: None,
        };
        assert_eq!(outcome.target(), "installation");
        assert_eq!(banned("a.example.com").target(), "a.example.com");
    }

    #[test]
    fn test_outcome_serialization_skips_empty() {
        let json = serde_json::to_string(&banned("a.example.com")).unwrap();
        assert!(json.contains("status_code"));
        assert!(!json.contains("error"));
    }
}
