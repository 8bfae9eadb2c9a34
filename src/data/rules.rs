//! Threshold rules and metric classification.
//!
//! Rules are declared per subsystem at configuration time and stay immutable
//! during operation. Classification is a pure function from a value and a
//! rule to a [`Status`].

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use super::status::{MetricValue, Status};

/// Direction of a threshold comparison.
///
/// `GreaterThan` rules breach as the value rises (latency, error counts);
/// `LessThan` rules breach as the value falls (health scores, peer counts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    GreaterThan,
    LessThan,
}

/// A declarative warning/critical bound pair for one metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdRule {
    pub metric: String,
    pub warning: f64,
    pub critical: f64,
    pub comparison: Comparison,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ThresholdRule {
    /// Check that the critical bound is at least as bad as the warning bound
    /// in the rule's direction. Misconfigured rules must fail startup, not
    /// misclassify at runtime.
    pub fn validate(&self) -> Result<()> {
        let ordered = match self.comparison {
            Comparison::GreaterThan => self.critical >= self.warning,
            Comparison::LessThan => self.critical <= self.warning,
        };
        if !ordered {
            bail!(
                "rule for metric '{}': critical bound {} contradicts warning bound {} for {:?}",
                self.metric,
                self.critical,
                self.warning,
                self.comparison
            );
        }
        Ok(())
    }
}

/// Classify a metric value against a threshold rule.
///
/// Pure and total: a non-numeric value under a numeric rule classifies as
/// `Fail` rather than being coerced or skipped.
pub fn evaluate(value: &MetricValue, rule: &ThresholdRule) -> Status {
    let Some(v) = value.as_number() else {
        return Status::Fail;
    };
    match rule.comparison {
        Comparison::GreaterThan => {
            if v >= rule.critical {
                Status::Critical
            } else if v >= rule.warning {
                Status::Warning
            } else {
                Status::Pass
            }
        }
        Comparison::LessThan => {
            if v <= rule.critical {
                Status::Critical
            } else if v <= rule.warning {
                Status::Warning
            } else {
                Status::Pass
            }
        }
    }
}

/// The validated set of threshold rules for one subsystem, keyed by metric.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: BTreeMap<String, ThresholdRule>,
}

impl RuleSet {
    /// Build a rule set, validating every rule and rejecting duplicates.
    pub fn new(rules: Vec<ThresholdRule>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for rule in rules {
            rule.validate()?;
            let name = rule.metric.clone();
            if map.insert(name.clone(), rule).is_some() {
                bail!("duplicate threshold rule for metric '{}'", name);
            }
        }
        Ok(Self { rules: map })
    }

    /// Look up the rule for a metric, if one is declared.
    pub fn get(&self, metric: &str) -> Option<&ThresholdRule> {
        self.rules.get(metric)
    }

    /// Classify one metric value.
    ///
    /// Unmonitored metrics always classify as `Pass` so incidental fields in
    /// a probe response never trigger alerts.
    pub fn classify(&self, metric: &str, value: &MetricValue) -> Status {
        match self.rules.get(metric) {
            Some(rule) => evaluate(value, rule),
            None => Status::Pass,
        }
    }

    /// Declared display unit for a metric, if any.
    pub fn unit(&self, metric: &str) -> Option<&str> {
        self.rules.get(metric).and_then(|r| r.unit.as_deref())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}
