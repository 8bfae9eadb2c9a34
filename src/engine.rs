//! Cycle orchestration: fan-out, deadline join, alerting, publication.
//!
//! Each cycle fans out one concurrent task per subsystem, joins them under a
//! cycle deadline, feeds degraded results to the alert dispatcher, and
//! publishes the aggregated snapshot. A single slow or unreachable subsystem
//! degrades only its own result, never the cycle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::aggregate::{aggregate, SnapshotPublisher};
use crate::alert::{AlertDispatcher, AlertSink};
use crate::check::run_check;
use crate::config::Settings;
use crate::data::{CheckResult, RuleSet, SystemSnapshot};
use crate::probe::MetricSource;

/// One configured subsystem check: its probe, rules, and timeout.
pub struct SubsystemCheck {
    pub probe: Arc<dyn MetricSource>,
    pub rules: RuleSet,
    pub timeout: Duration,
}

/// The monitoring engine: runs check cycles and publishes snapshots.
pub struct Engine {
    checks: Vec<SubsystemCheck>,
    dispatcher: AlertDispatcher,
    publisher: SnapshotPublisher,
    cycle_deadline: Duration,
}

impl Engine {
    pub fn new(
        checks: Vec<SubsystemCheck>,
        dispatcher: AlertDispatcher,
        publisher: SnapshotPublisher,
        cycle_deadline: Duration,
    ) -> Self {
        Self {
            checks,
            dispatcher,
            publisher,
            cycle_deadline,
        }
    }

    /// Build an engine from validated settings and an alert sink.
    pub fn from_settings(settings: &Settings, sink: Arc<dyn AlertSink>) -> Result<Self> {
        let mut checks = Vec::with_capacity(settings.subsystems.len());
        for (id, subsystem) in &settings.subsystems {
            let rules = RuleSet::new(subsystem.rules.clone())
                .with_context(|| format!("invalid threshold rules for subsystem '{}'", id))?;
            checks.push(SubsystemCheck {
                probe: subsystem.probe.build(id),
                rules,
                timeout: Duration::from_millis(subsystem.timeout_ms),
            });
        }

        let dispatcher = AlertDispatcher::new(settings.alerts.to_policy(), sink);
        let publisher = SnapshotPublisher::new(&settings.snapshot_path);
        Ok(Self::new(
            checks,
            dispatcher,
            publisher,
            Duration::from_secs(settings.cycle_deadline_secs),
        ))
    }

    /// Run one complete check cycle.
    ///
    /// All subsystem checks run concurrently. Checks still pending at the
    /// cycle deadline are aborted and recorded as FAIL so the snapshot stays
    /// fresh regardless of a stuck probe.
    pub async fn run_cycle(&self) -> Result<SystemSnapshot> {
        let deadline = tokio::time::Instant::now() + self.cycle_deadline;

        let mut tasks = JoinSet::new();
        for check in &self.checks {
            let probe = Arc::clone(&check.probe);
            let rules = check.rules.clone();
            let timeout = check.timeout;
            tasks.spawn(async move {
                let result = run_check(probe.as_ref(), &rules, timeout).await;
                (probe.subsystem().to_string(), result)
            });
        }

        let mut results: BTreeMap<String, CheckResult> = BTreeMap::new();
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((id, result)))) => {
                    results.insert(id, result);
                }
                Ok(Some(Err(e))) => {
                    // A panicked check task loses only its own result
                    error!("check task failed: {}", e);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!("cycle deadline reached with {} checks pending", tasks.len());
                    tasks.abort_all();
                    break;
                }
            }
        }

        // Anything without a result hit the cycle deadline.
        for check in &self.checks {
            let id = check.probe.subsystem();
            results.entry(id.to_string()).or_insert_with(|| {
                CheckResult::failed(id, "cycle deadline exceeded", Utc::now())
            });
        }

        let now = Utc::now();
        for result in results.values() {
            self.dispatcher.consider(result, now).await;
        }

        let snapshot = aggregate(results, now);
        self.publisher.publish(&snapshot).await?;

        info!(
            overall = %snapshot.overall_status,
            passed = snapshot.counts.passed,
            warning = snapshot.counts.warning,
            critical = snapshot.counts.critical,
            failed = snapshot.counts.failed,
            "cycle complete"
        );
        Ok(snapshot)
    }

    /// Run cycles forever at a fixed interval.
    ///
    /// A failed cycle (e.g., the snapshot path became unwritable) is logged
    /// and the next cycle still runs.
    pub async fn run_forever(&self, interval: Duration) -> Result<()> {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.run_cycle().await {
                error!("check cycle failed: {:#}", e);
            }
        }
    }
}
