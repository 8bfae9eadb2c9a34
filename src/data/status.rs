//! Core status and result types shared across the engine.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification for a metric or a whole subsystem.
///
/// Ordered from healthiest to worst, so worst-of reductions are just `max()`.
/// `Fail` means the probe itself could not be reached or returned unusable
/// data. It is distinct from `Critical`, which means the probe answered but a
/// value breached its critical threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Warning,
    Critical,
    Fail,
}

impl Status {
    /// Returns a short symbol for display and logging.
    pub fn symbol(&self) -> &'static str {
        match self {
            Status::Pass => "OK",
            Status::Warning => "WARN",
            Status::Critical => "CRIT",
            Status::Fail => "FAIL",
        }
    }

    /// True for any status that should raise or sustain an alert.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, Status::Pass)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Pass => "PASS",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Fail => "FAIL",
        };
        f.write_str(name)
    }
}

/// A metric value as reported by a probe.
///
/// Probes report loosely-typed payloads, so values are kept tagged rather
/// than coerced. A metric that is absent from a probe's response simply has
/// no entry in the [`MetricMap`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Text(String),
}

impl MetricValue {
    /// Returns the numeric value, or `None` for text values.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(n) => Some(*n),
            MetricValue::Text(_) => None,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Number(n) => write!(f, "{}", n),
            MetricValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(n: f64) -> Self {
        MetricValue::Number(n)
    }
}

impl From<&str> for MetricValue {
    fn from(s: &str) -> Self {
        MetricValue::Text(s.to_string())
    }
}

/// Raw metrics returned by one probe invocation, keyed by metric name.
///
/// A `BTreeMap` keeps iteration order deterministic, which in turn keeps
/// check results and snapshots deterministic.
pub type MetricMap = BTreeMap<String, MetricValue>;

/// One metric with its classified status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricReading {
    pub name: String,
    pub value: MetricValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub status: Status,
}

/// The outcome of checking one subsystem in one cycle.
///
/// Immutable once produced. `status` is the worst status among the metric
/// readings, or `Fail` when the probe itself failed (in which case `metrics`
/// is empty and `error` carries the reason).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub subsystem: String,
    pub status: Status,
    pub metrics: Vec<MetricReading>,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    /// Build a result from classified readings, reducing to the worst status.
    pub fn from_readings(
        subsystem: impl Into<String>,
        metrics: Vec<MetricReading>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let status = metrics
            .iter()
            .map(|m| m.status)
            .max()
            .unwrap_or(Status::Pass);
        Self {
            subsystem: subsystem.into(),
            status,
            metrics,
            timestamp,
            error: None,
        }
    }

    /// Build a failure result for a probe that could not be checked.
    pub fn failed(
        subsystem: impl Into<String>,
        error: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            subsystem: subsystem.into(),
            status: Status::Fail,
            metrics: Vec::new(),
            timestamp,
            error: Some(error.into()),
        }
    }
}

/// Per-status subsystem tallies included in each snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotCounts {
    pub passed: usize,
    pub warning: usize,
    pub critical: usize,
    pub failed: usize,
}

/// The aggregated point-in-time status document for the dashboard.
///
/// `overall_status` is always the worst status among `subsystems`. Snapshots
/// are disposable; only the alert dispatcher keeps state between cycles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub generated_at: DateTime<Utc>,
    pub overall_status: Status,
    pub counts: SnapshotCounts,
    pub subsystems: BTreeMap<String, CheckResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_ordering() {
        assert!(Status::Pass < Status::Warning);
        assert!(Status::Warning < Status::Critical);
        assert!(Status::Critical < Status::Fail);
    }

    #[test]
    fn test_status_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Status::Pass).unwrap(), "\"PASS\"");
        assert_eq!(serde_json::to_string(&Status::Fail).unwrap(), "\"FAIL\"");
    }

    #[test]
    fn test_metric_value_untagged_deserialize() {
        let n: MetricValue = serde_json::from_str("0.85").unwrap();
        assert_eq!(n.as_number(), Some(0.85));

        // Integers come through as numbers too
        let i: MetricValue = serde_json::from_str("12").unwrap();
        assert_eq!(i.as_number(), Some(12.0));

        let s: MetricValue = serde_json::from_str("\"degraded\"").unwrap();
        assert_eq!(s.as_number(), None);
    }

    #[test]
    fn test_from_readings_worst_of_metrics() {
        let readings = vec![
            MetricReading {
                name: "a".to_string(),
                value: 1.0.into(),
                unit: None,
                status: Status::Pass,
            },
            MetricReading {
                name: "b".to_string(),
                value: 2.0.into(),
                unit: None,
                status: Status::Warning,
            },
        ];
        let result = CheckResult::from_readings("mesh", readings, Utc::now());
        assert_eq!(result.status, Status::Warning);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_from_readings_empty_is_pass() {
        let result = CheckResult::from_readings("mesh", Vec::new(), Utc::now());
        assert_eq!(result.status, Status::Pass);
    }

    #[test]
    fn test_failed_result() {
        let result = CheckResult::failed("api", "connection refused", Utc::now());
        assert_eq!(result.status, Status::Fail);
        assert!(result.metrics.is_empty());
        assert_eq!(result.error.as_deref(), Some("connection refused"));
    }
}
