//! Runner script templates
//!
//! A template is an AutoHotkey script with three placeholder comments. Each
//! is replaced once, verbatim, when a test is executed.

use std::path::Path;

use tracing::debug;

use crate::error::{Result, TestingError};

/// Replaced by the `#Warn` configuration
pub const WARN_MARKER: &str = ";@ahkunit-warn";

/// Replaced by `#Include "<test file>"`
pub const INCLUDE_MARKER: &str = ";@ahkunit-include";

/// Replaced by the test's call chain
pub const CALL_MARKER: &str = ";@ahkunit-call";

const MARKERS: [&str; 3] = [WARN_MARKER, INCLUDE_MARKER, CALL_MARKER];

const BUNDLED_TEMPLATE: &str = include_str!("../templates/test-runner.ahk");

/// A validated runner template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTemplate {
    content: String,
}

impl Default for ScriptTemplate {
    fn default() -> Self {
        Self::bundled()
    }
}

impl ScriptTemplate {
    /// The template shipped with ahkunit
    pub fn bundled() -> Self {
        Self {
            content: BUNDLED_TEMPLATE.to_string(),
        }
    }

    /// Wrap template text, checking that every marker is present
    pub fn new(content: impl Into<String>) -> Result<Self> {
        let content = content.into();
        if let Some(marker) = MARKERS.into_iter().find(|m| !content.contains(*m)) {
            return Err(TestingError::TemplateMarkerMissing { marker });
        }
        Ok(Self { content })
    }

    /// Load a custom template from disk
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| TestingError::TemplateRead {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded runner template");
        Self::new(content)
    }

    /// Raw template text
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Produce a runnable script
    pub fn render(&self, warn_block: &str, test_file: &str, call_chain: &str) -> String {
        self.content
            .replacen(WARN_MARKER, warn_block, 1)
            .replacen(INCLUDE_MARKER, &include_directive(test_file), 1)
            .replacen(CALL_MARKER, call_chain, 1)
    }
}

/// `#Include` line for a test file. Backslashes become forward slashes so the
/// path survives AutoHotkey's escape handling.
pub fn include_directive(test_file: &str) -> String {
    format!("#Include \"{}\"", test_file.replace('\\', "/"))
}
