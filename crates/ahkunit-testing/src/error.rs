//! Error types for test discovery and execution

use std::path::PathBuf;
use thiserror::Error;

/// Result type for testing operations
pub type Result<T> = std::result::Result<T, TestingError>;

/// Errors raised outside the per-test outcome path.
///
/// Anything that goes wrong while a single test runs is folded into that
/// test's [`ExecutionOutcome`](crate::protocol::ExecutionOutcome) instead.
#[derive(Error, Debug)]
pub enum TestingError {
    /// A test id could not be split into file, classes and method
    #[error("Invalid test id '{id}': {reason}")]
    InvalidTestId { id: String, reason: String },

    /// Runner template is missing a substitution marker
    #[error("Runner template is missing the '{marker}' marker")]
    TemplateMarkerMissing { marker: &'static str },

    /// Runner template could not be read
    #[error("Failed to read runner template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Test file could not be read for discovery
    #[error("Failed to read test file {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Report could not be written
    #[error("Failed to write report to {path}: {message}")]
    ReportWrite { path: PathBuf, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TestingError {
    /// Create an invalid test id error
    pub fn invalid_id(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTestId {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Get exit code for CLI: 2 for bad input or configuration, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::InvalidTestId { .. }
            | Self::TemplateMarkerMissing { .. }
            | Self::TemplateRead { .. } => 2,
            Self::SourceRead { .. }
            | Self::ReportWrite { .. }
            | Self::Io(_)
            | Self::Serialization(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(TestingError::invalid_id("a::b", "no such test").exit_code(), 2);
        assert_eq!(
            TestingError::ReportWrite {
                path: PathBuf::from("out.xml"),
                message: "denied".to_string(),
            }
            .exit_code(),
            1
        );
    }
}
