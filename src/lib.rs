//! # prism-sentry
//!
//! A continuous health and SLA monitoring aggregator for PRISM subsystems.
//!
//! Periodic probes check each subsystem (the P2P mesh, the API tier, the SLA
//! harness, the compliance checker), metric values are classified against
//! declarative thresholds, degradations raise deduplicated and escalating
//! alerts, and every cycle rolls up into a single machine-readable snapshot
//! published atomically for a dashboard to poll.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                           Engine                               │
//! │                                                                │
//! │  probe (×N, concurrent)          alert                         │
//! │  ┌───────────┐   ┌─────────┐   ┌────────────────┐   ┌───────┐ │
//! │  │MetricSource│──▶│  check  │──▶│ AlertDispatcher│──▶│ Sink  │ │
//! │  └───────────┘   │ (rules) │   │ (cooldown/esc) │   └───────┘ │
//! │                  └────┬────┘   └────────────────┘             │
//! │                       │ CheckResult                           │
//! │                       ▼                                       │
//! │                  ┌─────────┐     ┌──────────────────┐         │
//! │                  │aggregate│────▶│SnapshotPublisher │         │
//! │                  └─────────┘     │ (atomic replace) │         │
//! │                                  └──────────────────┘         │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`probe`]**: the `MetricSource` trait with file, TCP, and command
//!   backed implementations
//! - **[`data`]**: the data model - statuses, threshold rules, check results,
//!   and snapshots
//! - **[`check`]**: one probe invocation with timeout and error containment
//! - **[`alert`]**: the per-key alert state machine (dedup, cooldown,
//!   escalation) and the delivery sink boundary
//! - **[`aggregate`]**: worst-of-subsystems reduction and atomic snapshot
//!   publication
//! - **[`engine`]**: cycle orchestration with a fan-out/join deadline
//! - **[`config`]**: settings loading with fail-fast rule validation
//!
//! ## Usage
//!
//! ```bash
//! # Run one check cycle and print the snapshot
//! prism-sentry --config sentry.toml --once
//!
//! # Run forever at the configured interval
//! prism-sentry --config sentry.toml
//! ```
//!
//! ## As a library
//!
//! ```no_run
//! use std::sync::Arc;
//! use prism_sentry::{Engine, LogSink, Settings};
//!
//! # tokio_test::block_on(async {
//! let settings = Settings::load("sentry.toml".as_ref())?;
//! let engine = Engine::from_settings(&settings, Arc::new(LogSink))?;
//! let snapshot = engine.run_cycle().await?;
//! println!("overall: {}", snapshot.overall_status);
//! # Ok::<_, anyhow::Error>(())
//! # });
//! ```

pub mod aggregate;
pub mod alert;
pub mod check;
pub mod config;
pub mod data;
pub mod engine;
pub mod probe;

// Re-export main types for convenience
pub use aggregate::{aggregate, SnapshotPublisher};
pub use alert::{AlertDispatcher, AlertNotice, AlertPolicy, AlertSink, ChannelSink, LogSink, Severity};
pub use check::run_check;
pub use config::{AlertSettings, ProbeSettings, Settings, SubsystemSettings};
pub use data::{
    evaluate, CheckResult, Comparison, MetricMap, MetricReading, MetricValue, RuleSet,
    SnapshotCounts, Status, SystemSnapshot, ThresholdRule,
};
pub use engine::{Engine, SubsystemCheck};
pub use probe::{CommandProbe, FileProbe, MetricSource, TcpProbe};
