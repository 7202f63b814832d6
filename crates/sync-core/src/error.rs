//! Error taxonomy for store operations and replication cycles.

use std::fmt;
use std::time::Duration;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a source or destination store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable, or the query failed at the driver level
    #[error("connection error: {0}")]
    Connection(BoxError),

    /// Uniqueness or schema violation while writing
    #[error("constraint violation: {0}")]
    Constraint(BoxError),

    /// The operation did not finish within the configured limit
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl StoreError {
    pub fn connection(err: impl Into<BoxError>) -> Self {
        StoreError::Connection(err.into())
    }

    pub fn constraint(err: impl Into<BoxError>) -> Self {
        StoreError::Constraint(err.into())
    }

    pub fn is_constraint(&self) -> bool {
        matches!(self, StoreError::Constraint(_))
    }

    /// Timeouts count as connection-class failures.
    pub fn is_connection(&self) -> bool {
        matches!(self, StoreError::Connection(_) | StoreError::Timeout(_))
    }
}

/// The step of a cycle that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    WatermarkRead,
    Fetch,
    Insert,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::WatermarkRead => "watermark-read",
            Stage::Fetch => "fetch",
            Stage::Insert => "insert",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cycle that ended in `Failed`.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
pub struct CycleError {
    pub stage: Stage,
    #[source]
    pub source: StoreError,
}

impl CycleError {
    pub fn new(stage: Stage, source: StoreError) -> Self {
        Self { stage, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_error_display_names_stage() {
        let err = CycleError::new(Stage::Fetch, StoreError::connection("host unreachable"));
        assert_eq!(
            err.to_string(),
            "fetch failed: connection error: host unreachable"
        );
    }

    #[test]
    fn test_timeout_is_connection_class() {
        let err = StoreError::Timeout(Duration::from_secs(5));
        assert!(err.is_connection());
        assert!(!err.is_constraint());
    }
}
