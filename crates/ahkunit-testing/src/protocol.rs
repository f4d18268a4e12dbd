//! Interpreting runner script output
//!
//! The runner prints `PASS` on success. On failure it prints a JSON error
//! payload between `<<<AHK_ERROR_START>>>` and `<<<AHK_ERROR_END>>>`. In
//! both cases it may print a coverage dump between `<<<AHK_LINES_START>>>`
//! and `<<<AHK_LINES_END>>>`. Anything else on stdout/stderr is test output.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::coverage::CoverageMap;

/// Success token
pub const PASS_TOKEN: &str = "PASS";

pub const ERROR_START: &str = "<<<AHK_ERROR_START>>>";
pub const ERROR_END: &str = "<<<AHK_ERROR_END>>>";
pub const LINES_START: &str = "<<<AHK_LINES_START>>>";
pub const LINES_END: &str = "<<<AHK_LINES_END>>>";

/// Warning printed by `#Warn ..., StdOut`: `<file> (<line>) : ==> <message>`
static WARNING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>.+) \((?P<line>\d+)\) : ==> (?P<message>.+)$").expect("Invalid regex")
});

/// Stack frame: `<file> (<line>) : [<context>] <code>`
static STACK_FRAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<file>.+)\s\((?P<line>\d+)\)\s:\s\[(?P<context>.*)\] (?P<code>.+)$")
        .expect("Invalid regex")
});

/// Test status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    /// The test ran and reported a failure
    Failed,
    /// The test could not be run or its output could not be understood
    Errored,
    Skipped,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Errored => "errored",
            Self::Skipped => "skipped",
        }
    }

    /// Whether this status should fail the run
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Errored)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One frame of an AutoHotkey call stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StackFrame {
    /// Free text with no location
    Annotation(String),
    /// A frame pointing at a source line (zero-based)
    Located {
        file: String,
        line: u32,
        label: String,
    },
}

/// Error thrown by a test, decoded from the runner's JSON payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedError {
    /// Human-readable message
    pub summary: String,
    /// File the error was thrown from
    pub file: String,
    /// Zero-based line the error was thrown from. Values thrown without a
    /// location arrive as raw line 0 and have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    pub stack_frames: Vec<StackFrame>,
}

/// Payload written by the runner template
#[derive(Debug, Deserialize)]
struct RawAhkError {
    #[serde(rename = "type")]
    kind: String,
    message: String,
    #[serde(default)]
    extra: Option<String>,
    #[serde(default)]
    stack: Option<String>,
    file: String,
    line: u32,
}

impl From<RawAhkError> for ParsedError {
    fn from(raw: RawAhkError) -> Self {
        let mut summary = format!("{}: {}", raw.kind, raw.message);
        if let Some(extra) = raw.extra.as_deref().filter(|e| !e.is_empty()) {
            summary.push_str("\n    Specifically: ");
            summary.push_str(extra);
        }
        if let Some(stack) = &raw.stack {
            summary.push_str("\n\n");
            summary.push_str(stack);
        }

        let stack_frames = raw.stack.as_deref().map(parse_stack).unwrap_or_default();

        Self {
            summary,
            file: raw.file,
            line: raw.line.checked_sub(1),
            stack_frames,
        }
    }
}

/// Result of executing one test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: TestStatus,
    /// Failure or error message; empty for passes
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ParsedError>,
    /// Output printed by the test itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageMap>,
    /// Interpreter warnings found in the output
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ScriptWarning>,
}

impl ExecutionOutcome {
    fn with_status(status: TestStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            duration_ms: None,
            error: None,
            raw_output: None,
            coverage: None,
            warnings: Vec::new(),
        }
    }

    pub fn passed() -> Self {
        Self::with_status(TestStatus::Passed, "")
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::with_status(TestStatus::Failed, message)
    }

    pub fn errored(message: impl Into<String>) -> Self {
        Self::with_status(TestStatus::Errored, message)
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::with_status(TestStatus::Skipped, reason)
    }

    /// The interpreter could not be started
    pub fn launch_failed(reason: impl fmt::Display) -> Self {
        Self::errored(format!("Failed to start AutoHotkey: {}", reason))
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    fn with_raw_output(mut self, output: &str) -> Self {
        self.raw_output = Some(output.to_string());
        self
    }

    fn with_coverage(mut self, coverage: Option<CoverageMap>) -> Self {
        self.coverage = coverage;
        self
    }

    fn with_warnings(mut self, warnings: Vec<ScriptWarning>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// A warning printed by the interpreter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptWarning {
    pub file: String,
    /// Zero-based line
    pub line: u32,
    pub message: String,
}

/// Find interpreter warnings in test output
pub fn find_warnings(output: &str) -> Vec<ScriptWarning> {
    output
        .lines()
        .filter_map(|line| WARNING_REGEX.captures(line))
        .map(|caps| ScriptWarning {
            file: caps["file"].to_string(),
            line: caps["line"]
                .parse::<u32>()
                .unwrap_or(0)
                .saturating_sub(1),
            message: caps["message"].to_string(),
        })
        .collect()
}

/// Split out the first `start ... end` section. Returns the section body and
/// the text with the section (markers included) removed.
fn extract_section<'a>(text: &'a str, start: &str, end: &str) -> (Option<&'a str>, String) {
    let Some(open) = text.find(start) else {
        return (None, text.to_string());
    };
    let body_start = open + start.len();
    let Some(close) = text[body_start..].find(end) else {
        return (None, text.to_string());
    };
    let body_end = body_start + close;

    let mut remaining = String::with_capacity(text.len() - (body_end + end.len() - open));
    remaining.push_str(&text[..open]);
    remaining.push_str(&text[body_end + end.len()..]);

    (Some(&text[body_start..body_end]), remaining)
}

fn exit_code_message(exit_code: Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("Exit code: {}", code),
        None => "Exit code: none".to_string(),
    }
}

/// Parse an AutoHotkey stack trace
pub fn parse_stack(stack: &str) -> Vec<StackFrame> {
    stack
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            if line.starts_with('>') {
                return StackFrame::Annotation(line.to_string());
            }
            match STACK_FRAME_REGEX.captures(line) {
                Some(caps) => {
                    let context = &caps["context"];
                    let label = if context.is_empty() {
                        &caps["code"]
                    } else {
                        context
                    };
                    StackFrame::Located {
                        file: caps["file"].to_string(),
                        line: caps["line"].parse::<u32>().unwrap_or(0).saturating_sub(1),
                        label: label.to_string(),
                    }
                }
                None => StackFrame::Annotation(line.chars().skip(2).collect()),
            }
        })
        .collect()
}

/// Classify the combined stdout/stderr of one runner process.
///
/// `exit_code` is `None` when the process was terminated by a signal. The
/// warning scan looks at the whole output, so it assumes one test per
/// process.
pub fn parse_output(output: &str, exit_code: Option<i32>, fail_on_warning: bool) -> ExecutionOutcome {
    let normalized = output.replace("\r\n", "\n").replace('\r', "\n");

    let (lines_section, remaining) = extract_section(&normalized, LINES_START, LINES_END);
    let coverage = lines_section.map(CoverageMap::parse);
    let remaining = remaining.trim();
    let warnings = find_warnings(remaining);

    let passed = exit_code == Some(0)
        && remaining.contains(PASS_TOKEN)
        && !(fail_on_warning && !warnings.is_empty());

    if passed {
        let test_output = remaining.replacen(PASS_TOKEN, "", 1);
        debug!(exit_code = ?exit_code, warnings = warnings.len(), "test passed");
        return ExecutionOutcome::passed()
            .with_raw_output(test_output.trim())
            .with_coverage(coverage)
            .with_warnings(warnings);
    }

    let (error_section, test_output) = extract_section(remaining, ERROR_START, ERROR_END);
    let fallback = if remaining.is_empty() {
        exit_code_message(exit_code)
    } else {
        remaining.to_string()
    };

    let outcome = match error_section {
        Some(json) => match serde_json::from_str::<RawAhkError>(json.trim()) {
            Ok(raw) => {
                let error = ParsedError::from(raw);
                let mut outcome = ExecutionOutcome::failed(error.summary.clone());
                outcome.error = Some(error);
                outcome.with_raw_output(test_output.trim())
            }
            Err(e) => {
                warn!(error = %e, "malformed error payload in test output");
                ExecutionOutcome::errored(fallback).with_raw_output(remaining)
            }
        },
        None => ExecutionOutcome::failed(fallback).with_raw_output(remaining),
    };

    debug!(exit_code = ?exit_code, status = %outcome.status, "test did not pass");
    outcome.with_coverage(coverage).with_warnings(warnings)
}
