//! Run progress reporting

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::identity::TestIdentity;
use crate::protocol::TestStatus;
use crate::runner::TestResult;

/// Status counts for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub skipped: usize,
    pub duration_ms: u64,
}

impl RunSummary {
    /// Tally a set of results
    pub fn from_results(results: &[TestResult], duration: Duration) -> Self {
        let mut summary = Self {
            total: results.len(),
            duration_ms: duration.as_millis() as u64,
            ..Self::default()
        };
        for result in results {
            match result.outcome.status {
                TestStatus::Passed => summary.passed += 1,
                TestStatus::Failed => summary.failed += 1,
                TestStatus::Errored => summary.errored += 1,
                TestStatus::Skipped => summary.skipped += 1,
            }
        }
        summary
    }

    /// No failures and no errors
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }
}

/// Events emitted during a test run
#[derive(Debug, Clone)]
pub enum RunEvent {
    /// The tests to run have been collected
    Collected { count: usize },
    /// A test's interpreter is about to be launched
    Started { id: TestIdentity },
    /// A test has an outcome
    Finished { result: TestResult },
    /// Every test has finished
    Completed { summary: RunSummary },
}

/// Receives run progress
pub trait RunReporter: Send + Sync {
    fn report(&self, event: &RunEvent);
}

/// Reporter that logs to tracing
#[derive(Debug, Default)]
pub struct TracingReporter;

impl RunReporter for TracingReporter {
    fn report(&self, event: &RunEvent) {
        match event {
            RunEvent::Collected { count } => {
                tracing::info!("Collected {} tests to run", count);
            }
            RunEvent::Started { id } => {
                tracing::debug!("Starting {}", id);
            }
            RunEvent::Finished { result } => {
                match result.outcome.status {
                    TestStatus::Passed => tracing::info!("PASS: {}", result.name),
                    TestStatus::Skipped => {
                        tracing::info!("SKIPPED: {} ({})", result.name, result.outcome.message)
                    }
                    TestStatus::Failed => tracing::warn!("FAIL: {}", result.name),
                    TestStatus::Errored => {
                        tracing::error!("ERROR: {}: {}", result.name, result.outcome.message)
                    }
                }
                for warning in &result.outcome.warnings {
                    tracing::warn!(
                        test = %result.id,
                        file = %warning.file,
                        line = warning.line + 1,
                        "interpreter warning: {}",
                        warning.message
                    );
                }
            }
            RunEvent::Completed { summary } => {
                tracing::info!(
                    "Run complete: {}/{} passed, {} failed, {} errored, {} skipped ({:.1}s)",
                    summary.passed,
                    summary.total,
                    summary.failed,
                    summary.errored,
                    summary.skipped,
                    summary.duration_ms as f64 / 1000.0
                );
            }
        }
    }
}

/// Reporter that collects events for later inspection (useful for testing)
#[derive(Debug, Default)]
pub struct CollectingReporter {
    events: Mutex<Vec<RunEvent>>,
}

impl CollectingReporter {
    /// Get all collected events
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl RunReporter for CollectingReporter {
    fn report(&self, event: &RunEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Fans events out to several reporters
#[derive(Default)]
pub struct ReporterSet {
    reporters: Vec<Arc<dyn RunReporter>>,
}

impl ReporterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<R: RunReporter + 'static>(mut self, reporter: R) -> Self {
        self.reporters.push(Arc::new(reporter));
        self
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }
}

impl RunReporter for ReporterSet {
    fn report(&self, event: &RunEvent) {
        for reporter in &self.reporters {
            reporter.report(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ExecutionOutcome;

    fn result(status: TestStatus) -> TestResult {
        let outcome = match status {
            TestStatus::Passed => ExecutionOutcome::passed(),
            TestStatus::Failed => ExecutionOutcome::failed("nope"),
            TestStatus::Errored => ExecutionOutcome::errored("crash"),
            TestStatus::Skipped => ExecutionOutcome::skipped("Cancelled"),
        };
        TestResult::new(&TestIdentity::parse("a.ahk::A::M").unwrap(), outcome)
    }

    #[test]
    fn test_summary_counts() {
        let results = vec![
            result(TestStatus::Passed),
            result(TestStatus::Passed),
            result(TestStatus::Failed),
            result(TestStatus::Skipped),
        ];
        let summary = RunSummary::from_results(&results, Duration::from_millis(1500));

        assert_eq!(summary.total, 4);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.duration_ms, 1500);
        assert!(!summary.is_success());

        let summary = RunSummary::from_results(&results[..2], Duration::ZERO);
        assert!(summary.is_success());
    }

    #[test]
    fn test_collecting_reporter() {
        let reporter = CollectingReporter::default();
        reporter.report(&RunEvent::Collected { count: 1 });
        reporter.report(&RunEvent::Finished {
            result: result(TestStatus::Errored),
        });

        let events = reporter.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], RunEvent::Collected { count: 1 }));
    }

    #[test]
    fn test_tracing_reporter() {
        let reporter = TracingReporter;

        // Just verify it doesn't panic
        reporter.report(&RunEvent::Finished {
            result: result(TestStatus::Failed),
        });
        reporter.report(&RunEvent::Completed {
            summary: RunSummary::default(),
        });
    }

    #[test]
    fn test_reporter_set_broadcasts() {
        let collecting = Arc::new(CollectingReporter::default());
        let mut set = ReporterSet::new().with(TracingReporter);
        set.reporters.push(collecting.clone());
        assert_eq!(set.len(), 2);

        set.report(&RunEvent::Collected { count: 3 });
        assert_eq!(collecting.events().len(), 1);
    }
}
