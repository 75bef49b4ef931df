use std::time::Duration;

use thiserror::Error;

/// Result type for metric operations
pub type Result<T> = std::result::Result<T, MetricError>;

/// Main error type for the metrics library
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    /// Prediction and target (or peer tensors) disagree on shape
    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        expected: String,
        actual: String,
    },

    /// Invalid parameter value or combination
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// Input values that cannot be interpreted by the metric
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Collective communication failed
    #[error("Communication error: {0}")]
    Communication(String),

    /// A collective did not complete in time
    #[error("Collective timed out on rank {rank} after {waited:?}")]
    Timeout {
        rank: usize,
        waited: Duration,
    },

    /// IO errors (file operations)
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for MetricError {
    fn from(err: std::io::Error) -> Self {
        MetricError::Io(err.to_string())
    }
}

impl From<bincode::Error> for MetricError {
    fn from(err: bincode::Error) -> Self {
        MetricError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for MetricError {
    fn from(err: serde_json::Error) -> Self {
        MetricError::Serialization(err.to_string())
    }
}

// Helper functions for common error patterns
impl MetricError {
    pub fn shape_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        MetricError::ShapeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        MetricError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        MetricError::InvalidInput(msg.into())
    }

    pub fn communication<S: Into<String>>(msg: S) -> Self {
        MetricError::Communication(msg.into())
    }

    /// True for failures raised by the collective layer
    pub fn is_collective_failure(&self) -> bool {
        matches!(self, MetricError::Communication(_) | MetricError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = MetricError::shape_mismatch("4 samples", "3 samples");
        assert_eq!(err.to_string(), "Shape mismatch: expected 4 samples, got 3 samples");

        let err = MetricError::invalid_parameter("average", "unknown mode 'median'");
        assert_eq!(err.to_string(), "Invalid parameter 'average': unknown mode 'median'");
    }

    #[test]
    fn test_collective_failure_classification() {
        assert!(MetricError::communication("peer left").is_collective_failure());
        assert!(MetricError::Timeout { rank: 1, waited: Duration::from_millis(5) }.is_collective_failure());
        assert!(!MetricError::invalid_input("empty").is_collective_failure());
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: MetricError = io.into();
        assert!(matches!(err, MetricError::Io(_)));
    }
}
