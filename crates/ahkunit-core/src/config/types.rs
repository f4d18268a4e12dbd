//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::defaults::{DEFAULT_EXECUTABLE_PATH, DEFAULT_TEST_FILE_GLOB};

/// Main configuration for ahkunit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the AutoHotkey v2 interpreter
    pub executable_path: PathBuf,

    /// Glob used to find test files, relative to the project root
    pub test_file_glob: String,

    /// Custom runner template (the bundled template is used when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_path: Option<PathBuf>,

    /// How interpreter warnings are treated
    pub warnings: WarningMode,

    /// Per-test timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Maximum number of tests run at once (unbounded when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jobs: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            executable_path: PathBuf::from(DEFAULT_EXECUTABLE_PATH),
            test_file_glob: DEFAULT_TEST_FILE_GLOB.to_string(),
            template_path: None,
            warnings: WarningMode::default(),
            timeout_secs: None,
            jobs: None,
        }
    }
}

impl Config {
    /// Per-test timeout as a duration
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Interpreter warning handling
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningMode {
    /// Warnings are disabled in the generated script
    #[default]
    Off,
    /// Warnings are written to stdout and shown with the test output
    Report,
    /// Warnings are written to stdout and any warning fails the test
    Fail,
}

impl WarningMode {
    /// Whether a reported warning turns a passing test into a failure
    pub fn fails_tests(&self) -> bool {
        matches!(self, Self::Fail)
    }

    /// The `#Warn` directive block inserted into the runner script
    pub fn directive(&self) -> &'static str {
        match self {
            Self::Off => "#Warn All, Off",
            Self::Report | Self::Fail => "#Warn All, StdOut",
        }
    }
}

impl std::fmt::Display for WarningMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::Report => write!(f, "report"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.test_file_glob, "**/*.test.ahk");
        assert_eq!(config.warnings, WarningMode::Off);
        assert!(config.timeout().is_none());
        assert!(config.jobs.is_none());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: Config = serde_yaml::from_str("warnings: fail\ntimeout_secs: 30\n").unwrap();
        assert_eq!(config.warnings, WarningMode::Fail);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.executable_path, PathBuf::from(DEFAULT_EXECUTABLE_PATH));
    }

    #[test]
    fn test_warning_directive() {
        assert_eq!(WarningMode::Off.directive(), "#Warn All, Off");
        assert_eq!(WarningMode::Report.directive(), "#Warn All, StdOut");
        assert!(WarningMode::Fail.fails_tests());
        assert!(!WarningMode::Report.fails_tests());
    }
}
