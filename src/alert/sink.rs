//! Alert delivery boundary.
//!
//! Delivery transports (chat, email, pager) live outside this crate; the
//! dispatcher only talks to the [`AlertSink`] trait. Delivery failures are
//! the sink's concern and never stop health checking.

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Alert severity, ordered so escalation is a step up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    /// One level up; `Critical` stays `Critical`.
    pub fn escalate(self) -> Self {
        match self {
            Severity::Medium => Severity::High,
            Severity::High | Severity::Critical => Severity::Critical,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// One alert handed to the delivery collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertNotice {
    pub subsystem: String,
    pub metric: String,
    pub severity: Severity,
    pub message: String,
    /// Optional override of the delivery channel (used for escalations).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
}

/// Destination for alerts.
///
/// Fire-and-forget from the dispatcher's perspective: a sink that cannot
/// deliver returns an error and the dispatcher retries once, then drops the
/// alert with a log line.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Deliver one alert notice.
    async fn deliver(&self, notice: &AlertNotice) -> Result<()>;
}

/// A sink that writes alerts to the tracing log.
///
/// Useful on its own for single-node deployments and as the fallback when no
/// external transport is wired up.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl AlertSink for LogSink {
    async fn deliver(&self, notice: &AlertNotice) -> Result<()> {
        match notice.severity {
            Severity::Critical => error!(
                subsystem = %notice.subsystem,
                metric = %notice.metric,
                severity = %notice.severity,
                channel = notice.channel.as_deref().unwrap_or("default"),
                "{}",
                notice.message
            ),
            _ => warn!(
                subsystem = %notice.subsystem,
                metric = %notice.metric,
                severity = %notice.severity,
                channel = notice.channel.as_deref().unwrap_or("default"),
                "{}",
                notice.message
            ),
        }
        Ok(())
    }
}

/// A sink that forwards alerts into a channel.
///
/// Designed for embedding: the host application receives notices and bridges
/// them to its own transport. Also the sink used by the dispatcher tests.
#[derive(Debug)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<AlertNotice>,
}

impl ChannelSink {
    /// Create a sink and the receiving end for its notices.
    pub fn create() -> (Self, mpsc::UnboundedReceiver<AlertNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { sender: tx }, rx)
    }
}

#[async_trait]
impl AlertSink for ChannelSink {
    async fn deliver(&self, notice: &AlertNotice) -> Result<()> {
        self.sender
            .send(notice.clone())
            .map_err(|_| anyhow::anyhow!("alert receiver dropped"))
    }
}
