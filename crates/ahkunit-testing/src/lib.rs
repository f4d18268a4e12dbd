//! ahkunit testing - discovery, execution and coverage for AutoHotkey v2 tests
//!
//! Tests are zero-argument methods on (possibly nested) classes in `.ahk`
//! files. Each test runs in its own interpreter process, driven by a small
//! generated runner script, and its result is rebuilt from the process's
//! plain-text output.
//!
//! # Pipeline
//!
//! - [`parser`] recovers the class/method tree from source text
//! - [`tree`] assigns `::`-joined ids to the parsed nodes
//! - [`executor`] renders a runner script and launches the interpreter
//! - [`protocol`] classifies the captured output
//! - [`coverage`] parses per-test line dumps and folds them per file
//! - [`runner`] runs many tests concurrently under one cancellation token
//! - [`report`] renders the finished run

pub mod coverage;
pub mod error;
pub mod executor;
pub mod identity;
pub mod parser;
pub mod protocol;
pub mod report;
pub mod reporter;
pub mod runner;
pub mod template;
pub mod tree;

pub use coverage::{CoverageAggregator, CoverageMap, CoverageReport, FileCoverage};
pub use error::{Result, TestingError};
pub use executor::{ExecutorConfig, TestExecutor};
pub use identity::TestIdentity;
pub use parser::{parse_test_file, TestClassNode, TestMethodNode};
pub use protocol::{ExecutionOutcome, ParsedError, ScriptWarning, StackFrame, TestStatus};
pub use report::{ReportFormat, ReportGenerator};
pub use reporter::{
    CollectingReporter, ReporterSet, RunEvent, RunReporter, RunSummary, TracingReporter,
};
pub use runner::{RunOrchestrator, RunReport, RunnerConfig, TestResult};
pub use template::ScriptTemplate;
pub use tree::{TestItem, TestItemKind, TestTree};
