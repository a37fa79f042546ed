//! Error types for result extraction.

use thiserror::Error;

/// Main error type for result extraction and frame assembly.
#[derive(Error, Debug)]
pub enum Error {
    /// The requested time window contains no readable results
    #[error("No results in time window [{start}, {stop}]")]
    NoData { start: f64, stop: f64 },

    /// Allocation failure while reading an entity
    #[error("Not enough memory: {0}")]
    OutOfMemory(String),

    /// Evaluator used against a cursor other than the one it was built for
    #[error("Evaluator built for cursor {built} used with cursor {current}")]
    StaleEvaluator { built: u64, current: u64 },

    /// Type mismatch when reading a variable
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    /// Animation kind not handled by the frame pipeline
    #[error("Unsupported animation: {0}")]
    UnsupportedAnimation(String),

    /// Inconsistent archive content
    #[error("Invalid archive data: {0}")]
    InvalidArchive(String),

    /// Export writer failure
    #[error("Export failed: {0}")]
    ExportFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an out-of-memory error.
    pub fn out_of_memory(msg: impl Into<String>) -> Self {
        Self::OutOfMemory(msg.into())
    }

    /// Create an export error.
    pub fn export(msg: impl Into<String>) -> Self {
        Self::ExportFailed(msg.into())
    }

    /// Check whether this is a recoverable allocation failure.
    #[inline]
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory(_))
    }
}

impl From<std::collections::TryReserveError> for Error {
    fn from(e: std::collections::TryReserveError) -> Self {
        Self::OutOfMemory(e.to_string())
    }
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::NoData { start: 1.0, stop: 2.0 };
        assert!(e.to_string().contains("[1, 2]"));

        let e = Error::StaleEvaluator { built: 3, current: 7 };
        assert!(e.to_string().contains("3"));
        assert!(e.to_string().contains("7"));
    }

    #[test]
    fn test_error_from_try_reserve() {
        let mut v: Vec<u64> = Vec::new();
        let err: Error = v.try_reserve_exact(usize::MAX).unwrap_err().into();
        assert!(err.is_out_of_memory());
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_out_of_memory());
    }
}
