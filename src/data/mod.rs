//! Data model for checks, thresholds, and snapshots.
//!
//! ## Submodules
//!
//! - [`status`]: Core types ([`Status`], [`MetricValue`], [`CheckResult`],
//!   [`SystemSnapshot`])
//! - [`rules`]: Threshold rules and the pure [`evaluate`](rules::evaluate)
//!   classification function
//!
//! ## Data Flow
//!
//! ```text
//! MetricMap (raw probe output)
//!        │
//!        ▼
//! RuleSet::classify()  (per metric)
//!        │
//!        ▼
//! CheckResult (worst-of-metrics status)
//!        │
//!        ▼
//! SystemSnapshot (worst-of-subsystems status)
//! ```

pub mod rules;
pub mod status;

pub use rules::{evaluate, Comparison, RuleSet, ThresholdRule};
pub use status::{
    CheckResult, MetricMap, MetricReading, MetricValue, SnapshotCounts, Status, SystemSnapshot,
};
