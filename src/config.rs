//! Configuration loading and fail-fast validation.
//!
//! Settings are loaded once at process start from a TOML file plus
//! `SENTRY_*` environment overrides, and stay immutable during operation.
//! Rule misconfiguration is the one class of error that is fatal to startup:
//! a contradictory threshold pair must never reach a running cycle.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::alert::AlertPolicy;
use crate::data::{RuleSet, ThresholdRule};
use crate::probe::{CommandProbe, FileProbe, MetricSource, TcpProbe};

fn default_interval_secs() -> u64 {
    30
}

fn default_cycle_deadline_secs() -> u64 {
    20
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("status.json")
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_cooldown_secs() -> u64 {
    300
}

fn default_escalate_after() -> u32 {
    3
}

/// Top-level sentry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Seconds between check cycles in `run forever` mode.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Overall deadline for one cycle; checks still pending when it expires
    /// are recorded as FAIL so the snapshot stays fresh.
    #[serde(default = "default_cycle_deadline_secs")]
    pub cycle_deadline_secs: u64,

    /// Where the aggregated snapshot is published for the dashboard.
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,

    #[serde(default)]
    pub alerts: AlertSettings,

    /// Monitored subsystems, keyed by subsystem id.
    #[serde(default)]
    pub subsystems: BTreeMap<String, SubsystemSettings>,
}

/// Alert policy knobs.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertSettings {
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_escalate_after")]
    pub escalate_after: u32,
    /// Metric names that always alert at critical severity with mandatory
    /// escalation (e.g., security-related breaches).
    #[serde(default)]
    pub critical_metrics: Vec<String>,
    #[serde(default)]
    pub escalation_channel: Option<String>,
    #[serde(default)]
    pub notify_recovery: bool,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
            escalate_after: default_escalate_after(),
            critical_metrics: Vec::new(),
            escalation_channel: None,
            notify_recovery: false,
        }
    }
}

impl AlertSettings {
    pub fn to_policy(&self) -> AlertPolicy {
        AlertPolicy {
            cooldown: Duration::from_secs(self.cooldown_secs),
            escalate_after: self.escalate_after,
            critical_metrics: self.critical_metrics.iter().cloned().collect(),
            escalation_channel: self.escalation_channel.clone(),
            notify_recovery: self.notify_recovery,
        }
    }
}

/// One monitored subsystem: how to probe it and which thresholds apply.
#[derive(Debug, Clone, Deserialize)]
pub struct SubsystemSettings {
    pub probe: ProbeSettings,
    /// Per-probe timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub rules: Vec<ThresholdRule>,
}

/// Probe backend selection.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProbeSettings {
    /// Read a JSON metrics file.
    File { path: PathBuf },
    /// Read one line of JSON from a TCP endpoint.
    Tcp { addr: String },
    /// Run a command and parse its stdout as JSON.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl ProbeSettings {
    /// Construct the probe for a subsystem.
    pub fn build(&self, subsystem: &str) -> Arc<dyn MetricSource> {
        match self {
            ProbeSettings::File { path } => Arc::new(FileProbe::new(subsystem, path)),
            ProbeSettings::Tcp { addr } => Arc::new(TcpProbe::new(subsystem, addr.clone())),
            ProbeSettings::Command { program, args } => {
                Arc::new(CommandProbe::new(subsystem, program.clone(), args.clone()))
            }
        }
    }
}

impl Settings {
    /// Load settings from a file, with `SENTRY_*` environment overrides.
    /// Nested keys use `__`, e.g. `SENTRY_ALERTS__COOLDOWN_SECS`.
    pub fn load(path: &Path) -> Result<Self> {
        let cfg = Config::builder()
            .add_source(File::from(path))
            .add_source(
                Environment::with_prefix("SENTRY")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("failed to load config from {}", path.display()))?;

        let settings: Settings = cfg
            .try_deserialize()
            .context("invalid configuration structure")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Fail fast on configuration that must never reach a running cycle.
    pub fn validate(&self) -> Result<()> {
        if self.subsystems.is_empty() {
            bail!("no subsystems configured");
        }
        if self.interval_secs == 0 {
            bail!("interval_secs must be greater than zero");
        }
        if self.cycle_deadline_secs == 0 {
            bail!("cycle_deadline_secs must be greater than zero");
        }
        for (id, subsystem) in &self.subsystems {
            if subsystem.timeout_ms == 0 {
                bail!("subsystem '{}': timeout_ms must be greater than zero", id);
            }
            RuleSet::new(subsystem.rules.clone())
                .with_context(|| format!("invalid threshold rules for subsystem '{}'", id))?;
        }
        Ok(())
    }
}
