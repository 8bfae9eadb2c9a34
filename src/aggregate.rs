//! Aggregation of check results into a system snapshot, and atomic
//! publication of that snapshot for the dashboard collaborator.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::data::{CheckResult, SnapshotCounts, Status, SystemSnapshot};

/// Combine the latest result from every subsystem into one snapshot.
///
/// `overall_status` is the worst status across all results. Subsystems that
/// did not run this cycle are simply absent from the input map and do not
/// affect the overall status. Pure with respect to its inputs: identical
/// results and timestamp produce byte-identical serialized snapshots.
pub fn aggregate(
    results: BTreeMap<String, CheckResult>,
    generated_at: DateTime<Utc>,
) -> SystemSnapshot {
    let overall_status = results
        .values()
        .map(|r| r.status)
        .max()
        .unwrap_or(Status::Pass);

    let mut counts = SnapshotCounts::default();
    for result in results.values() {
        match result.status {
            Status::Pass => counts.passed += 1,
            Status::Warning => counts.warning += 1,
            Status::Critical => counts.critical += 1,
            Status::Fail => counts.failed += 1,
        }
    }

    SystemSnapshot {
        generated_at,
        overall_status,
        counts,
        subsystems: results,
    }
}

/// Writes snapshots to a well-known path for the dashboard to poll.
///
/// Publication is an atomic replace: the document is written to a sibling
/// temp file and renamed into place, so a reader always sees either the old
/// or the new complete snapshot, never a mix.
#[derive(Debug, Clone)]
pub struct SnapshotPublisher {
    path: PathBuf,
}

impl SnapshotPublisher {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the published path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Publish one snapshot, replacing the previous one atomically.
    pub async fn publish(&self, snapshot: &SystemSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)?;

        // Rename is atomic on the same filesystem, so the temp file must be a
        // sibling of the target.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .with_context(|| format!("failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("failed to replace {}", self.path.display()))?;

        debug!(path = %self.path.display(), bytes = json.len(), "snapshot published");
        Ok(())
    }
}
