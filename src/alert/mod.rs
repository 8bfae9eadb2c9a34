//! Alert dispatching with deduplication, cooldown, and escalation.
//!
//! The dispatcher owns the only state that persists between check cycles: a
//! map of active alerts keyed by `(subsystem, metric)`. Each key runs a small
//! state machine:
//!
//! ```text
//!            breach                      breach after cooldown
//!  Quiet ────────────▶ Active ──────────────────────────────▶ Active
//!    ▲   (dispatch)      │     (re-dispatch, maybe escalate)
//!    │                   │
//!    └───────────────────┘
//!          PASS (retire, log, optional resolved notice)
//! ```

mod sink;

pub use sink::{AlertNotice, AlertSink, ChannelSink, LogSink, Severity};

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::data::{CheckResult, Status};

/// Reserved metric key for source-level failures (probe unreachable or
/// returning unusable output as a whole).
const PROBE_METRIC: &str = "probe";

/// Policy knobs for the dispatcher.
#[derive(Debug, Clone)]
pub struct AlertPolicy {
    /// Minimum time between repeated alerts for the same unresolved breach.
    pub cooldown: Duration,
    /// Number of consecutive re-alerts after which severity is raised and the
    /// escalation channel is notified.
    pub escalate_after: u32,
    /// Metric names that always alert at `critical` severity and notify the
    /// escalation channel from the first breach.
    pub critical_metrics: BTreeSet<String>,
    /// Channel override used for escalation notices.
    pub escalation_channel: Option<String>,
    /// Whether recovery sends a resolved notice (in addition to the log line).
    pub notify_recovery: bool,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(300),
            escalate_after: 3,
            critical_metrics: BTreeSet::new(),
            escalation_channel: None,
            notify_recovery: false,
        }
    }
}

/// State for one unresolved breach.
#[derive(Debug, Clone)]
struct ActiveAlert {
    severity: Severity,
    first_seen: DateTime<Utc>,
    last_sent: DateTime<Utc>,
    occurrences: u32,
    realerts: u32,
    escalated: bool,
}

#[derive(Debug, Default)]
struct DispatchState {
    /// Active alerts keyed by (subsystem, metric).
    active: HashMap<(String, String), ActiveAlert>,
    /// Newest result timestamp seen per subsystem, for discarding stale cycles.
    latest: HashMap<String, DateTime<Utc>>,
}

/// Turns degraded check results into alerts, applying deduplication and
/// escalation rules before handing them to the delivery sink.
pub struct AlertDispatcher {
    policy: AlertPolicy,
    sink: Arc<dyn AlertSink>,
    state: Mutex<DispatchState>,
}

impl AlertDispatcher {
    pub fn new(policy: AlertPolicy, sink: Arc<dyn AlertSink>) -> Self {
        Self {
            policy,
            sink,
            state: Mutex::new(DispatchState::default()),
        }
    }

    /// Number of currently active (unresolved) alerts.
    pub fn active_count(&self) -> usize {
        self.state.lock().map(|s| s.active.len()).unwrap_or(0)
    }

    /// Consider one check result against the alert state.
    ///
    /// `now` is injected so cooldown and escalation are testable with a fake
    /// clock; the engine passes `Utc::now()`. Returns the number of notices
    /// dispatched for this result.
    pub async fn consider(&self, result: &CheckResult, now: DateTime<Utc>) -> usize {
        let to_send = self.transition(result, now);
        let dispatched = to_send.len();
        for notice in &to_send {
            self.deliver_with_retry(notice).await;
        }
        dispatched
    }

    /// Run the state machine for one result and collect the notices to send.
    ///
    /// Pure state manipulation under the lock; delivery happens afterwards so
    /// the lock is never held across an await point.
    fn transition(&self, result: &CheckResult, now: DateTime<Utc>) -> Vec<AlertNotice> {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Discard out-of-order updates from stale or delayed cycles.
        if let Some(latest) = state.latest.get(&result.subsystem) {
            if result.timestamp < *latest {
                debug!(
                    subsystem = %result.subsystem,
                    "discarding stale result ({} < {})",
                    result.timestamp,
                    latest
                );
                return Vec::new();
            }
        }
        state
            .latest
            .insert(result.subsystem.clone(), result.timestamp);

        let breaches = Self::breaches(result);
        let mut to_send = Vec::new();

        for (metric, status, message) in &breaches {
            let key = (result.subsystem.clone(), metric.clone());
            let forced = self.policy.critical_metrics.contains(metric);
            let severity = if forced {
                Severity::Critical
            } else {
                match status {
                    Status::Warning => Severity::Medium,
                    _ => Severity::High,
                }
            };

            match state.active.get_mut(&key) {
                None => {
                    state.active.insert(
                        key,
                        ActiveAlert {
                            severity,
                            first_seen: now,
                            last_sent: now,
                            occurrences: 1,
                            // Forced-critical metrics carry mandatory
                            // escalation from the first breach.
                            realerts: 0,
                            escalated: forced,
                        },
                    );
                    to_send.push(AlertNotice {
                        subsystem: result.subsystem.clone(),
                        metric: metric.clone(),
                        severity,
                        message: message.clone(),
                        channel: None,
                    });
                    if forced {
                        to_send.push(self.escalation_notice(
                            &result.subsystem,
                            metric,
                            severity,
                            message,
                        ));
                    }
                }
                Some(alert) => {
                    alert.occurrences += 1;
                    // A breach that worsens raises the stored severity so
                    // re-alerts reflect the current classification; it never
                    // lowers while the alert is active.
                    alert.severity = alert.severity.max(severity);
                    let since_last = now
                        .signed_duration_since(alert.last_sent)
                        .to_std()
                        .unwrap_or(Duration::ZERO);
                    if since_last < self.policy.cooldown {
                        continue;
                    }

                    alert.realerts += 1;
                    alert.last_sent = now;

                    if alert.realerts >= self.policy.escalate_after && !alert.escalated {
                        alert.escalated = true;
                        alert.severity = alert.severity.escalate();
                        let escalated_message = format!(
                            "{} (unresolved after {} re-alerts, severity raised to {})",
                            message, alert.realerts, alert.severity
                        );
                        to_send.push(self.escalation_notice(
                            &result.subsystem,
                            metric,
                            alert.severity,
                            &escalated_message,
                        ));
                    }

                    to_send.push(AlertNotice {
                        subsystem: result.subsystem.clone(),
                        metric: metric.clone(),
                        severity: alert.severity,
                        message: message.clone(),
                        channel: None,
                    });
                }
            }
        }

        // A source-level failure says nothing about individual metrics, so
        // it must never retire their alerts. Only a result that actually
        // reports a metric recovers it.
        if result.status == Status::Fail && result.metrics.is_empty() {
            return to_send;
        }

        // Retire alerts for this subsystem whose metric recovered.
        let breached: BTreeSet<&String> = breaches.iter().map(|(m, _, _)| m).collect();
        let recovered: Vec<(String, String)> = state
            .active
            .keys()
            .filter(|(subsystem, metric)| {
                *subsystem == result.subsystem && !breached.contains(metric)
            })
            .cloned()
            .collect();
        for key in recovered {
            if let Some(alert) = state.active.remove(&key) {
                info!(
                    subsystem = %key.0,
                    metric = %key.1,
                    occurrences = alert.occurrences,
                    "alert cleared, metric recovered"
                );
                if self.policy.notify_recovery {
                    to_send.push(AlertNotice {
                        subsystem: key.0.clone(),
                        metric: key.1.clone(),
                        severity: Severity::Medium,
                        message: format!("{}: {} recovered", key.0, key.1),
                        channel: None,
                    });
                }
            }
        }

        to_send
    }

    /// Collect the breached (metric, status, message) triples from a result.
    fn breaches(result: &CheckResult) -> Vec<(String, Status, String)> {
        if result.status == Status::Fail && result.metrics.is_empty() {
            let reason = result.error.as_deref().unwrap_or("unknown probe failure");
            return vec![(
                PROBE_METRIC.to_string(),
                Status::Fail,
                format!("{}: probe check failed: {}", result.subsystem, reason),
            )];
        }

        result
            .metrics
            .iter()
            .filter(|reading| reading.status.is_degraded())
            .map(|reading| {
                let unit = reading.unit.as_deref().unwrap_or("");
                (
                    reading.name.clone(),
                    reading.status,
                    format!(
                        "{}: {} = {}{} classified {}",
                        result.subsystem, reading.name, reading.value, unit, reading.status
                    ),
                )
            })
            .collect()
    }

    fn escalation_notice(
        &self,
        subsystem: &str,
        metric: &str,
        severity: Severity,
        message: &str,
    ) -> AlertNotice {
        AlertNotice {
            subsystem: subsystem.to_string(),
            metric: metric.to_string(),
            severity,
            message: message.to_string(),
            channel: self.policy.escalation_channel.clone(),
        }
    }

    /// Deliver one notice, retrying once on failure.
    ///
    /// A broken alert channel must not stop health checking, so the second
    /// failure only logs and drops the notice.
    async fn deliver_with_retry(&self, notice: &AlertNotice) {
        if let Err(first) = self.sink.deliver(notice).await {
            warn!(
                subsystem = %notice.subsystem,
                metric = %notice.metric,
                "alert delivery failed, retrying: {:#}",
                first
            );
            if let Err(second) = self.sink.deliver(notice).await {
                warn!(
                    subsystem = %notice.subsystem,
                    metric = %notice.metric,
                    "dropping alert after failed retry: {:#}",
                    second
                );
            }
        }
    }
}
