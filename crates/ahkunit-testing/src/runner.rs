//! Concurrent test runs
//!
//! Every requested test gets its own tokio task and interpreter process.
//! The only state shared between tests is the coverage aggregator, which is
//! fed once per finished test after all tasks have been joined.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::coverage::{CoverageAggregator, CoverageReport};
use crate::executor::TestExecutor;
use crate::identity::TestIdentity;
use crate::protocol::ExecutionOutcome;
use crate::reporter::{RunEvent, RunReporter, RunSummary};

/// Options for a run
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    /// Maximum number of concurrent interpreters (unbounded when unset)
    pub jobs: Option<usize>,
    /// Collect and report line coverage
    pub coverage: bool,
}

/// Outcome of one test in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Full `file::Class::Method` id
    pub id: String,
    pub file: String,
    /// Dotted `Class.Method` name
    pub name: String,
    #[serde(flatten)]
    pub outcome: ExecutionOutcome,
}

impl TestResult {
    pub fn new(identity: &TestIdentity, outcome: ExecutionOutcome) -> Self {
        Self {
            id: identity.to_string(),
            file: identity.file.clone(),
            name: identity.display_name(),
            outcome,
        }
    }
}

/// Everything a finished run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub results: Vec<TestResult>,
    pub summary: RunSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageReport>,
    /// The run was cancelled before every test finished
    pub cancelled: bool,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }
}

/// Runs many tests concurrently under one cancellation token
pub struct RunOrchestrator {
    executor: Arc<TestExecutor>,
    config: RunnerConfig,
    reporter: Arc<dyn RunReporter>,
}

impl RunOrchestrator {
    pub fn new(executor: TestExecutor, config: RunnerConfig, reporter: Arc<dyn RunReporter>) -> Self {
        Self {
            executor: Arc::new(executor),
            config,
            reporter,
        }
    }

    /// Run the given tests. Results come back in request order.
    pub async fn run(&self, tests: Vec<TestIdentity>, cancel: CancellationToken) -> RunReport {
        let start = Instant::now();
        info!(tests = tests.len(), jobs = ?self.config.jobs, coverage = self.config.coverage, "starting test run");
        self.reporter.report(&RunEvent::Collected { count: tests.len() });

        let semaphore = self
            .config
            .jobs
            .map(|jobs| Arc::new(Semaphore::new(jobs.max(1))));

        let mut handles = Vec::with_capacity(tests.len());
        for identity in tests {
            let executor = self.executor.clone();
            let reporter = self.reporter.clone();
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let task_identity = identity.clone();

            let handle = tokio::spawn(async move {
                let identity = task_identity;
                let _permit = match semaphore {
                    Some(semaphore) => tokio::select! {
                        permit = semaphore.acquire_owned() => permit.ok(),
                        _ = cancel.cancelled() => None,
                    },
                    None => None,
                };

                if !cancel.is_cancelled() {
                    reporter.report(&RunEvent::Started { id: identity.clone() });
                }
                let outcome = executor.run(&identity, &cancel).await;

                let result = TestResult::new(&identity, outcome);
                reporter.report(&RunEvent::Finished {
                    result: result.clone(),
                });
                result
            });

            handles.push((identity, handle));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (identity, handle) in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => {
                    warn!(test = %identity, error = %e, "test task panicked");
                    let result = TestResult::new(
                        &identity,
                        ExecutionOutcome::errored(format!("Test task panicked: {}", e)),
                    );
                    self.reporter.report(&RunEvent::Finished {
                        result: result.clone(),
                    });
                    results.push(result);
                }
            }
        }

        let coverage = self.config.coverage.then(|| {
            let mut aggregator = CoverageAggregator::new();
            for result in &mut results {
                if let Some(map) = result.outcome.coverage.take() {
                    aggregator.record(result.id.clone(), map);
                }
            }
            aggregator.report()
        });

        let summary = RunSummary::from_results(&results, start.elapsed());
        info!(
            passed = summary.passed,
            failed = summary.failed,
            errored = summary.errored,
            skipped = summary.skipped,
            "test run finished"
        );
        self.reporter.report(&RunEvent::Completed {
            summary: summary.clone(),
        });

        RunReport {
            results,
            summary,
            coverage,
            cancelled: cancel.is_cancelled(),
        }
    }
}
