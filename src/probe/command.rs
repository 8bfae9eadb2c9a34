//! Command-based probe.
//!
//! Runs a harness script and parses its stdout as JSON metrics. This matches
//! how the SLA and compliance harnesses report their results.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

use super::MetricSource;
use crate::data::MetricMap;

/// A probe that spawns a command and parses its stdout as a JSON metric map.
///
/// The command must exit successfully and print a single JSON object; a
/// non-zero exit or unparseable output is a probe failure, not a metric.
#[derive(Debug)]
pub struct CommandProbe {
    subsystem: String,
    program: String,
    args: Vec<String>,
    description: String,
}

impl CommandProbe {
    /// Create a new command probe.
    pub fn new(
        subsystem: impl Into<String>,
        program: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        let subsystem = subsystem.into();
        let program = program.into();
        let description = format!("command: {}", program);
        Self {
            subsystem,
            program,
            args,
            description,
        }
    }
}

#[async_trait]
impl MetricSource for CommandProbe {
    async fn fetch(&self) -> Result<MetricMap> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.program))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            );
        }

        let metrics: MetricMap = serde_json::from_slice(&output.stdout)
            .with_context(|| format!("malformed metrics from {}", self.program))?;
        Ok(metrics)
    }

    fn subsystem(&self) -> &str {
        &self.subsystem
    }

    fn description(&self) -> &str {
        &self.description
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_command_probe_parses_stdout() {
        let probe = CommandProbe::new(
            "sla",
            "echo",
            vec![r#"{"tests_passed": 42, "tests_failed": 0}"#.to_string()],
        );
        let metrics = probe.fetch().await.unwrap();
        assert_eq!(metrics["tests_passed"].as_number(), Some(42.0));
        assert_eq!(metrics["tests_failed"].as_number(), Some(0.0));
    }

    #[tokio::test]
    async fn test_command_probe_nonzero_exit() {
        let probe = CommandProbe::new("sla", "false", Vec::new());
        let err = probe.fetch().await.unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[tokio::test]
    async fn test_command_probe_missing_program() {
        let probe = CommandProbe::new("sla", "/nonexistent/harness", Vec::new());
        let err = probe.fetch().await.unwrap_err();
        assert!(err.to_string().contains("failed to run"));
    }

    #[tokio::test]
    async fn test_command_probe_non_json_output() {
        let probe = CommandProbe::new("sla", "echo", vec!["all good".to_string()]);
        let err = probe.fetch().await.unwrap_err();
        assert!(err.to_string().contains("malformed metrics"));
    }

    #[test]
    fn test_command_probe_identity() {
        let probe = CommandProbe::new("sla", "harness.sh", Vec::new());
        assert_eq!(probe.subsystem(), "sla");
        assert_eq!(probe.description(), "command: harness.sh");
    }
}
