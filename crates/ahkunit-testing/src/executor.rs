//! Single-test execution
//!
//! Each test gets its own runner script in the temp directory and its own
//! interpreter process:
//!
//! ```text
//! <interpreter> /ErrorStdOut=UTF-8 <script> <test dir>
//! ```
//!
//! with the test file's directory as the working directory.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tempfile::TempPath;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use ahkunit_core::{Config, WarningMode};

use crate::error::Result;
use crate::identity::TestIdentity;
use crate::protocol::{parse_output, ExecutionOutcome};
use crate::template::ScriptTemplate;

/// How long to wait for the output pipes after the process exits
const OUTPUT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings shared by every execution in a run
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// AutoHotkey v2 interpreter
    pub interpreter: PathBuf,
    pub warnings: WarningMode,
    /// Kill the interpreter after this long
    pub timeout: Option<Duration>,
    pub template: ScriptTemplate,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self::from_parts(&Config::default(), ScriptTemplate::bundled())
    }
}

impl ExecutorConfig {
    /// Build from loaded configuration, reading a custom template if one is
    /// configured
    pub fn from_config(config: &Config) -> Result<Self> {
        let template = match &config.template_path {
            Some(path) => ScriptTemplate::from_file(path)?,
            None => ScriptTemplate::bundled(),
        };
        Ok(Self::from_parts(config, template))
    }

    fn from_parts(config: &Config, template: ScriptTemplate) -> Self {
        Self {
            interpreter: config.executable_path.clone(),
            warnings: config.warnings,
            timeout: config.timeout(),
            template,
        }
    }
}

/// How the wait for the interpreter ended
enum Exit {
    Finished(std::io::Result<ExitStatus>),
    Cancelled,
    TimedOut(Duration),
}

/// Runs one test at a time; cheap to share across tasks behind an `Arc`
#[derive(Debug, Clone)]
pub struct TestExecutor {
    config: ExecutorConfig,
}

impl TestExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Render the runner script for a test
    pub fn build_script(&self, identity: &TestIdentity) -> String {
        self.config.template.render(
            self.config.warnings.directive(),
            &identity.file,
            &identity.call_chain(),
        )
    }

    /// Run a single test and classify the result. Never fails: every problem
    /// is folded into the returned outcome.
    pub async fn run(&self, identity: &TestIdentity, cancel: &CancellationToken) -> ExecutionOutcome {
        if cancel.is_cancelled() {
            return ExecutionOutcome::skipped("Cancelled");
        }

        let start = Instant::now();
        let script = match write_script(identity, &self.build_script(identity)) {
            Ok(path) => path,
            Err(e) => {
                warn!(test = %identity, error = %e, "failed to write runner script");
                return ExecutionOutcome::errored(format!("Failed to write runner script: {}", e));
            }
        };

        let outcome = self.launch(&script, identity, cancel).await;

        let script_display = script.display().to_string();
        if let Err(e) = script.close() {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(script = %script_display, error = %e, "failed to remove runner script");
            }
        }

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(test = %identity, status = %outcome.status, duration_ms = elapsed, "test finished");
        outcome.with_duration(elapsed)
    }

    async fn launch(
        &self,
        script: &Path,
        identity: &TestIdentity,
        cancel: &CancellationToken,
    ) -> ExecutionOutcome {
        let test_dir = identity.file_dir();

        let mut command = Command::new(&self.config.interpreter);
        command
            .arg("/ErrorStdOut=UTF-8")
            .arg(script)
            .arg(&test_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if !test_dir.as_os_str().is_empty() {
            command.current_dir(&test_dir);
        }

        debug!(
            test = %identity,
            interpreter = %self.config.interpreter.display(),
            script = %script.display(),
            "spawning interpreter"
        );

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(test = %identity, error = %e, "failed to start interpreter");
                return ExecutionOutcome::launch_failed(e);
            }
        };

        let stdout_task = child.stdout.take().map(|s| tokio::spawn(read_stream(s)));
        let stderr_task = child.stderr.take().map(|s| tokio::spawn(read_stream(s)));

        let exit = tokio::select! {
            status = child.wait() => Exit::Finished(status),
            _ = cancel.cancelled() => Exit::Cancelled,
            elapsed = deadline(self.config.timeout) => Exit::TimedOut(elapsed),
        };

        match exit {
            Exit::Finished(Ok(status)) => {
                let stdout = collect(stdout_task).await;
                let stderr = collect(stderr_task).await;
                let output = stdout + &stderr;
                parse_output(&output, status.code(), self.config.warnings.fails_tests())
            }
            Exit::Finished(Err(e)) => {
                abort(stdout_task, stderr_task);
                ExecutionOutcome::errored(format!("Failed to wait for AutoHotkey: {}", e))
            }
            Exit::Cancelled => {
                debug!(test = %identity, "cancellation requested; killing interpreter");
                if let Err(e) = child.kill().await {
                    warn!(test = %identity, error = %e, "failed to kill cancelled interpreter");
                }
                abort(stdout_task, stderr_task);
                ExecutionOutcome::skipped("Cancelled")
            }
            Exit::TimedOut(limit) => {
                warn!(test = %identity, timeout_secs = limit.as_secs(), "test timed out; killing interpreter");
                if let Err(e) = child.kill().await {
                    warn!(test = %identity, error = %e, "failed to kill timed-out interpreter");
                }
                abort(stdout_task, stderr_task);
                ExecutionOutcome::errored(format!("Timed out after {}s", limit.as_secs()))
            }
        }
    }
}

/// Resolves after `timeout`, or never
async fn deadline(timeout: Option<Duration>) -> Duration {
    match timeout {
        Some(limit) => {
            tokio::time::sleep(limit).await;
            limit
        }
        None => std::future::pending().await,
    }
}

async fn read_stream<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut buf = Vec::new();
    if let Err(e) = reader.read_to_end(&mut buf).await {
        debug!(error = %e, "output stream closed with error");
    }
    String::from_utf8_lossy(&buf).into_owned()
}

async fn collect(task: Option<JoinHandle<String>>) -> String {
    let Some(task) = task else {
        return String::new();
    };
    match tokio::time::timeout(OUTPUT_CAPTURE_TIMEOUT, task).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!(error = %e, "output capture task failed");
            String::new()
        }
        Err(_) => {
            warn!("timed out capturing interpreter output");
            String::new()
        }
    }
}

fn abort(stdout: Option<JoinHandle<String>>, stderr: Option<JoinHandle<String>>) {
    for task in [stdout, stderr].into_iter().flatten() {
        task.abort();
    }
}

/// Write the runner script to a uniquely named temp file. The file is
/// removed when the returned path is closed or dropped.
fn write_script(identity: &TestIdentity, script: &str) -> std::io::Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(&format!("ahkunit-{}.", identity.display_name()))
        .suffix(".temp.ahk")
        .tempfile()?;
    file.write_all(script.as_bytes())?;
    file.flush()?;
    Ok(file.into_temp_path())
}
