//! Probe abstraction for fetching subsystem metrics.
//!
//! This module provides a trait-based abstraction over the different ways a
//! subsystem exposes its metrics (a JSON file on disk, a TCP endpoint, a
//! harness script). Probes are the only suspension point in a check cycle;
//! everything downstream is pure computation.

mod command;
mod file;
mod tcp;

pub use command::CommandProbe;
pub use file::FileProbe;
pub use tcp::TcpProbe;

use std::fmt::Debug;

use anyhow::Result;
use async_trait::async_trait;

use crate::data::MetricMap;

/// A probe capable of fetching the current metrics for one subsystem.
///
/// Implementations may fail independently (unreachable endpoint, malformed
/// output); the check runner contains those failures so one broken probe
/// never aborts the cycle. Callers bound each fetch with a timeout.
#[async_trait]
pub trait MetricSource: Send + Sync + Debug {
    /// Fetch the subsystem's current metrics.
    ///
    /// Returns the raw metric map on success. Transport and parse failures
    /// are reported as errors, never as partial data.
    async fn fetch(&self) -> Result<MetricMap>;

    /// Identifier of the subsystem this probe checks (e.g., "mesh", "api").
    fn subsystem(&self) -> &str;

    /// Human-readable description of where metrics come from.
    ///
    /// Used in logs and failure messages.
    fn description(&self) -> &str;
}
