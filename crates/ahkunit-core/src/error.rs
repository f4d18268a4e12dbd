//! Error types for ahkunit core

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Main error type for core operations
#[derive(Debug, Error)]
pub enum CoreError {
    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Discovery-related errors
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}

/// Test file discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Path given for discovery does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Glob pattern failed to compile
    #[error("Invalid test file glob '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },
}

impl CoreError {
    /// Check if this is a configuration problem the user can fix
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Discovery(DiscoveryError::InvalidGlob { .. }))
    }
}
