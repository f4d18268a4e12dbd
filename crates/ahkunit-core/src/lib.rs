//! ahkunit core - configuration and test file discovery
//!
//! This crate holds the pieces of ahkunit that do not depend on the test
//! protocol itself: loading `ahkunit.yaml` / `ahkunit.toml`, validating it,
//! and walking a project tree for test files.

pub mod config;
pub mod discovery;
pub mod error;

pub use config::{load_config, load_config_or_default, Config, WarningMode};
pub use discovery::{discover_test_files, TestFileMatcher};
pub use error::{ConfigError, CoreError, DiscoveryError, Result};
