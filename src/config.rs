//! Serializable metric configuration
//!
//! Configs load from JSON so the same file can drive every worker of a run.
//!
//! ```
//! use ddp_metrics::config::MetricConfig;
//! use ddp_metrics::distributed::ReduceOp;
//! use ddp_metrics::functional::ClassAverage;
//!
//! let config = MetricConfig::from_json_str(
//!     r#"{ "sync": { "reduce_op": "sum" }, "classification": { "num_classes": 3, "average": "macro" } }"#,
//! ).unwrap();
//! assert_eq!(config.sync.reduce_op, ReduceOp::Sum);
//! assert_eq!(config.classification.average, ClassAverage::Macro);
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::distributed::ReduceOp;
use crate::error::{MetricError, Result};
use crate::functional::ClassAverage;

/// How results are synchronised across ranks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub reduce_op: ReduceOp,
    /// Upper bound on one collective round, in milliseconds
    pub timeout_ms: u64,
}

impl SyncConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            reduce_op: ReduceOp::Mean,
            timeout_ms: 30_000,
        }
    }
}

/// Options shared by the classification metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// Inferred from the labels when absent; set it when reducing across ranks
    pub num_classes: Option<usize>,
    pub average: ClassAverage,
    /// Score given to a class whose ratio has a zero denominator
    pub zero_division: f32,
    /// Positive class for curve metrics
    pub pos_label: usize,
    pub beta: f32,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            num_classes: None,
            average: ClassAverage::Micro,
            zero_division: 0.0,
            pos_label: 1,
            beta: 1.0,
        }
    }
}

impl ClassificationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.num_classes == Some(0) {
            return Err(MetricError::invalid_parameter(
                "num_classes".to_string(),
                "must be positive".to_string(),
            ));
        }
        if !self.zero_division.is_finite() {
            return Err(MetricError::invalid_parameter(
                "zero_division".to_string(),
                format!("must be finite, got {}", self.zero_division),
            ));
        }
        if !(self.beta.is_finite() && self.beta > 0.0) {
            return Err(MetricError::invalid_parameter(
                "beta".to_string(),
                format!("must be a positive finite number, got {}", self.beta),
            ));
        }
        if let Some(classes) = self.num_classes {
            if self.pos_label >= classes {
                return Err(MetricError::invalid_parameter(
                    "pos_label".to_string(),
                    format!("{} is out of range for {} classes", self.pos_label, classes),
                ));
            }
        }
        Ok(())
    }
}

/// Root configuration
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    pub sync: SyncConfig,
    pub classification: ClassificationConfig,
}

impl MetricConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: MetricConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)?;
        fs::write(path, serialized)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.classification.validate()
    }
}
