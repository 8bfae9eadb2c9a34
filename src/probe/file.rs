//! File-based probe.
//!
//! Reads a JSON metrics file written by the monitored subsystem.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::MetricSource;
use crate::data::MetricMap;

/// A probe that reads subsystem metrics from a JSON file.
///
/// This is the simplest integration mode: the subsystem (or its harness)
/// periodically writes a flat JSON object mapping metric names to values,
/// and this probe reads the latest contents on every check.
#[derive(Debug)]
pub struct FileProbe {
    subsystem: String,
    path: PathBuf,
    description: String,
}

impl FileProbe {
    /// Create a new file probe for the given subsystem and path.
    pub fn new(subsystem: impl Into<String>, path: impl AsRef<Path>) -> Self {
        let subsystem = subsystem.into();
        let path = path.as_ref().to_path_buf();
        let description = format!("file: {}", path.display());
        Self {
            subsystem,
            path,
            description,
        }
    }

    /// Returns the path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MetricSource for FileProbe {
    async fn fetch(&self) -> Result<MetricMap> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read {}", self.path.display()))?;
        let metrics: MetricMap = serde_json::from_str(&content)
            .with_context(|| format!("malformed metrics in {}", self.path.display()))?;
        Ok(metrics)
    }

    fn subsystem(&self) -> &str {
        &self.subsystem
    }

    fn description(&self) -> &str {
        &self.description
    }
}
