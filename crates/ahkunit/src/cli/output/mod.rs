//! Output formatting utilities

use console::{style, Style};
use indicatif::{ProgressBar, ProgressStyle};

use ahkunit_testing::{RunEvent, RunReporter, TestResult, TestStatus};

/// Print a success message
pub fn success(message: &str) {
    println!("{} {}", style("✓").green().bold(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red().bold(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    println!("{} {}", style("!").yellow().bold(), message);
}

/// Create a styled header
pub fn header(text: &str) -> String {
    style(text).bold().to_string()
}

/// Create a styled key-value line
pub fn key_value(key: &str, value: &str) -> String {
    format!("  {}: {}", style(key).dim(), value)
}

/// Style for paths
pub fn path_style() -> Style {
    Style::new().cyan()
}

/// Console line for a finished test, e.g. `PASS: Math.Adds`
pub fn result_line(result: &TestResult) -> String {
    match result.outcome.status {
        TestStatus::Passed => format!("{} {}", style("PASS:").green().bold(), result.name),
        TestStatus::Failed => format!("{} {}", style("FAIL:").red().bold(), result.name),
        TestStatus::Errored => format!("{} {}", style("ERROR:").red().bold(), result.name),
        TestStatus::Skipped => format!("{} {}", style("SKIPPED:").yellow().bold(), result.name),
    }
}

/// Prints one line per finished test above a progress bar
pub struct ConsoleReporter {
    progress: ProgressBar,
    verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        let progress = ProgressBar::new(0);
        progress.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/dim}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        Self { progress, verbose }
    }

    fn print_result(&self, result: &TestResult) {
        self.progress.println(result_line(result));

        let outcome = &result.outcome;
        if outcome.status.is_failure() {
            for line in outcome.message.lines() {
                self.progress
                    .println(format!("    {}", style(line).red().dim()));
            }
        }

        // Captured output is noise for passing tests unless asked for
        if outcome.status == TestStatus::Passed && !self.verbose {
            return;
        }
        if let Some(output) = outcome.raw_output.as_deref().filter(|o| !o.is_empty()) {
            for line in output.lines() {
                self.progress.println(format!("    {}", style(line).dim()));
            }
        }
    }
}

impl RunReporter for ConsoleReporter {
    fn report(&self, event: &RunEvent) {
        match event {
            RunEvent::Collected { count } => {
                self.progress.set_length(*count as u64);
                self.progress
                    .println(format!("Collected {} tests to run", style(count).bold()));
            }
            RunEvent::Started { id } => {
                self.progress.set_message(id.display_name());
            }
            RunEvent::Finished { result } => {
                self.print_result(result);
                self.progress.inc(1);
            }
            RunEvent::Completed { .. } => {
                self.progress.finish_and_clear();
            }
        }
    }
}
