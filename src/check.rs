//! Check runner: one probe invocation with timeout and error containment.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use crate::data::{CheckResult, MetricReading, RuleSet};
use crate::probe::MetricSource;

/// Run a single check against one subsystem.
///
/// Invokes the probe with a bounded timeout, classifies every returned metric
/// against its rule, and reduces to a single subsystem status. A timeout or
/// transport error yields a `Fail` result instead of propagating, so the
/// caller can always continue checking other subsystems.
pub async fn run_check(
    probe: &dyn MetricSource,
    rules: &RuleSet,
    timeout: Duration,
) -> CheckResult {
    let subsystem = probe.subsystem();

    let metrics = match tokio::time::timeout(timeout, probe.fetch()).await {
        Ok(Ok(metrics)) => metrics,
        Ok(Err(e)) => {
            warn!(subsystem, source = probe.description(), "probe failed: {:#}", e);
            return CheckResult::failed(subsystem, format!("{:#}", e), Utc::now());
        }
        Err(_) => {
            warn!(
                subsystem,
                source = probe.description(),
                "probe timed out after {:?}",
                timeout
            );
            return CheckResult::failed(
                subsystem,
                format!("timed out after {:?}", timeout),
                Utc::now(),
            );
        }
    };

    debug!(subsystem, ?metrics, "raw metrics");

    let readings: Vec<MetricReading> = metrics
        .into_iter()
        .map(|(name, value)| {
            let status = rules.classify(&name, &value);
            let unit = rules.unit(&name).map(str::to_string);
            MetricReading {
                name,
                value,
                unit,
                status,
            }
        })
        .collect();

    CheckResult::from_readings(subsystem, readings, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use crate::data::{Comparison, MetricMap, Status, ThresholdRule};

    #[derive(Debug)]
    enum StubBehavior {
        Metrics(MetricMap),
        Error(&'static str),
        Hang,
    }

    #[derive(Debug)]
    struct StubProbe {
        subsystem: &'static str,
        behavior: StubBehavior,
    }

    #[async_trait]
    impl MetricSource for StubProbe {
        async fn fetch(&self) -> Result<MetricMap> {
            match &self.behavior {
                StubBehavior::Metrics(m) => Ok(m.clone()),
                StubBehavior::Error(e) => bail!("{}", e),
                StubBehavior::Hang => {
                    std::future::pending::<()>().await;
                    unreachable!()
                }
            }
        }

        fn subsystem(&self) -> &str {
            self.subsystem
        }

        fn description(&self) -> &str {
            "stub"
        }
    }

    fn mesh_rules() -> RuleSet {
        RuleSet::new(vec![
            ThresholdRule {
                metric: "health_score".to_string(),
                warning: 0.9,
                critical: 0.7,
                comparison: Comparison::LessThan,
                unit: None,
            },
            ThresholdRule {
                metric: "storage_latency_ms".to_string(),
                warning: 40.0,
                critical: 50.0,
                comparison: Comparison::GreaterThan,
                unit: Some("ms".to_string()),
            },
        ])
        .unwrap()
    }

    fn metrics(entries: &[(&str, f64)]) -> MetricMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), (*v).into()))
            .collect()
    }

    #[tokio::test]
    async fn test_check_classifies_and_reduces() {
        let probe = StubProbe {
            subsystem: "mesh",
            behavior: StubBehavior::Metrics(metrics(&[
                ("health_score", 0.85),
                ("storage_latency_ms", 60.0),
                ("connected_peers", 8.0),
            ])),
        };

        let result = run_check(&probe, &mesh_rules(), Duration::from_secs(1)).await;

        assert_eq!(result.subsystem, "mesh");
        // Worst of WARNING (health) and CRITICAL (latency)
        assert_eq!(result.status, Status::Critical);
        assert_eq!(result.metrics.len(), 3);

        let latency = result
            .metrics
            .iter()
            .find(|m| m.name == "storage_latency_ms")
            .unwrap();
        assert_eq!(latency.status, Status::Critical);
        assert_eq!(latency.unit.as_deref(), Some("ms"));

        let peers = result
            .metrics
            .iter()
            .find(|m| m.name == "connected_peers")
            .unwrap();
        assert_eq!(peers.status, Status::Pass);
    }

    #[tokio::test]
    async fn test_check_all_healthy() {
        let probe = StubProbe {
            subsystem: "mesh",
            behavior: StubBehavior::Metrics(metrics(&[
                ("health_score", 0.95),
                ("storage_latency_ms", 10.0),
            ])),
        };

        let result = run_check(&probe, &mesh_rules(), Duration::from_secs(1)).await;
        assert_eq!(result.status, Status::Pass);
    }

    #[tokio::test]
    async fn test_check_malformed_metric_folds_in_fail() {
        let mut m = MetricMap::new();
        m.insert("health_score".to_string(), "broken".into());
        let probe = StubProbe {
            subsystem: "mesh",
            behavior: StubBehavior::Metrics(m),
        };

        let result = run_check(&probe, &mesh_rules(), Duration::from_secs(1)).await;
        assert_eq!(result.status, Status::Fail);
        // The probe answered, so the reading is still recorded
        assert_eq!(result.metrics.len(), 1);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_check_probe_error_is_fail() {
        let probe = StubProbe {
            subsystem: "api",
            behavior: StubBehavior::Error("connection refused"),
        };

        let result = run_check(&probe, &RuleSet::default(), Duration::from_secs(1)).await;
        assert_eq!(result.status, Status::Fail);
        assert!(result.metrics.is_empty());
        assert!(result.error.as_deref().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_check_timeout_contained() {
        let probe = StubProbe {
            subsystem: "api",
            behavior: StubBehavior::Hang,
        };

        let started = Instant::now();
        let result = run_check(&probe, &RuleSet::default(), Duration::from_millis(50)).await;
        let elapsed = started.elapsed();

        assert_eq!(result.status, Status::Fail);
        assert!(result.error.as_deref().unwrap().contains("timed out"));
        // Must return within timeout plus scheduling slack
        assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);
    }
}
