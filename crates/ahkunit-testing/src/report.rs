//! Test report generation
//!
//! Renders a finished run as plain text, JSON or JUnit XML. Tests are grouped
//! into one suite per test file.

use std::io::Write;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::coverage::CoverageReport;
use crate::error::{Result, TestingError};
use crate::protocol::TestStatus;
use crate::reporter::RunSummary;
use crate::runner::{RunReport, TestResult};

/// Report output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Pretty,
    Json,
    Junit,
}

/// Results of one test file
struct Suite<'a> {
    name: &'a str,
    tests: Vec<&'a TestResult>,
}

impl Suite<'_> {
    fn count(&self, status: TestStatus) -> usize {
        self.tests
            .iter()
            .filter(|t| t.outcome.status == status)
            .count()
    }

    fn duration_secs(&self) -> f64 {
        self.tests
            .iter()
            .filter_map(|t| t.outcome.duration_ms)
            .sum::<u64>() as f64
            / 1000.0
    }
}

/// Group results by file, keeping first-seen order
fn suites(report: &RunReport) -> Vec<Suite<'_>> {
    let mut suites: Vec<Suite<'_>> = Vec::new();
    for result in &report.results {
        match suites.iter_mut().find(|s| s.name == result.file) {
            Some(suite) => suite.tests.push(result),
            None => suites.push(Suite {
                name: &result.file,
                tests: vec![result],
            }),
        }
    }
    suites
}

/// JSON document layout
#[derive(Serialize)]
struct JsonReport<'a> {
    success: bool,
    cancelled: bool,
    #[serde(flatten)]
    summary: &'a RunSummary,
    results: &'a [TestResult],
    #[serde(skip_serializing_if = "Option::is_none")]
    coverage: Option<&'a CoverageReport>,
}

/// Report generator for various formats
pub struct ReportGenerator;

impl ReportGenerator {
    /// Generate report in the specified format
    pub fn generate(report: &RunReport, format: ReportFormat) -> String {
        match format {
            ReportFormat::Pretty => Self::generate_pretty(report),
            ReportFormat::Json => Self::generate_json(report),
            ReportFormat::Junit => Self::generate_junit(report),
        }
    }

    /// Generate human-readable output
    pub fn generate_pretty(report: &RunReport) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str("                         TEST RESULTS\n");
        output.push_str("═══════════════════════════════════════════════════════════════\n\n");

        for suite in suites(report) {
            output.push_str(&format!("  {} ({} tests)\n", suite.name, suite.tests.len()));
            output.push_str("  ─────────────────────────────────────────────────────────────\n");

            for test in &suite.tests {
                let status_icon = match test.outcome.status {
                    TestStatus::Passed => "✓",
                    TestStatus::Failed => "✗",
                    TestStatus::Errored => "!",
                    TestStatus::Skipped => "○",
                };

                output.push_str(&format!(
                    "    {} {} ({}ms)\n",
                    status_icon,
                    test.name,
                    test.outcome.duration_ms.unwrap_or(0)
                ));

                if test.outcome.status != TestStatus::Passed {
                    for line in test.outcome.message.lines() {
                        output.push_str(&format!("        {}\n", line));
                    }
                }
                for warning in &test.outcome.warnings {
                    output.push_str(&format!(
                        "        warning: {} ({}): {}\n",
                        warning.file,
                        warning.line + 1,
                        warning.message
                    ));
                }
            }
            output.push('\n');
        }

        let summary = &report.summary;
        output.push_str("═══════════════════════════════════════════════════════════════\n");
        output.push_str(&format!(
            "  SUMMARY: {} passed, {} failed, {} errored, {} skipped ({}ms)\n",
            summary.passed, summary.failed, summary.errored, summary.skipped, summary.duration_ms
        ));

        if let Some(ref coverage) = report.coverage {
            output.push_str(&format!(
                "  COVERAGE: {:.1}% lines ({}/{})\n",
                coverage.line_coverage * 100.0,
                coverage.lines_covered(),
                coverage.lines_total()
            ));
            for file in &coverage.files {
                output.push_str(&format!(
                    "    {:>5.1}%  {}\n",
                    file.line_coverage * 100.0,
                    file.path
                ));
            }
        }

        output.push_str("═══════════════════════════════════════════════════════════════\n");

        if report.cancelled {
            output.push_str("\n  ○ Run cancelled.\n\n");
        } else if report.is_success() {
            output.push_str("\n  ✓ All tests passed!\n\n");
        } else {
            output.push_str("\n  ✗ Some tests failed.\n\n");
        }

        output
    }

    /// Generate JSON output
    pub fn generate_json(report: &RunReport) -> String {
        let output = JsonReport {
            success: report.is_success(),
            cancelled: report.cancelled,
            summary: &report.summary,
            results: &report.results,
            coverage: report.coverage.as_ref(),
        };
        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }

    /// Generate JUnit XML output
    pub fn generate_junit(report: &RunReport) -> String {
        let mut xml = String::new();
        let summary = &report.summary;

        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!(
            "<testsuites name=\"ahkunit\" tests=\"{}\" failures=\"{}\" errors=\"{}\" skipped=\"{}\" time=\"{:.3}\" timestamp=\"{}\">\n",
            summary.total,
            summary.failed,
            summary.errored,
            summary.skipped,
            summary.duration_ms as f64 / 1000.0,
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
        ));

        for suite in suites(report) {
            xml.push_str(&format!(
                "  <testsuite name=\"{}\" tests=\"{}\" failures=\"{}\" errors=\"{}\" skipped=\"{}\" time=\"{:.3}\">\n",
                escape_xml(suite.name),
                suite.tests.len(),
                suite.count(TestStatus::Failed),
                suite.count(TestStatus::Errored),
                suite.count(TestStatus::Skipped),
                suite.duration_secs()
            ));

            for test in &suite.tests {
                let (classname, name) = test.name.rsplit_once('.').unwrap_or(("", test.name.as_str()));
                let open = format!(
                    "    <testcase name=\"{}\" classname=\"{}\" time=\"{:.3}\"",
                    escape_xml(name),
                    escape_xml(classname),
                    test.outcome.duration_ms.unwrap_or(0) as f64 / 1000.0
                );
                let message = &test.outcome.message;
                let headline = message.lines().next().unwrap_or_default();

                match test.outcome.status {
                    TestStatus::Passed => {
                        xml.push_str(&open);
                        xml.push_str("/>\n");
                    }
                    TestStatus::Failed => {
                        let type_name = headline.split_once(':').map(|(t, _)| t).unwrap_or("Error");
                        xml.push_str(&open);
                        xml.push_str(">\n");
                        xml.push_str(&format!(
                            "      <failure message=\"{}\" type=\"{}\">{}</failure>\n",
                            escape_xml(headline),
                            escape_xml(type_name),
                            escape_xml(message)
                        ));
                        push_system_out(&mut xml, test);
                        xml.push_str("    </testcase>\n");
                    }
                    TestStatus::Errored => {
                        xml.push_str(&open);
                        xml.push_str(">\n");
                        xml.push_str(&format!(
                            "      <error message=\"{}\">{}</error>\n",
                            escape_xml(headline),
                            escape_xml(message)
                        ));
                        push_system_out(&mut xml, test);
                        xml.push_str("    </testcase>\n");
                    }
                    TestStatus::Skipped => {
                        xml.push_str(&open);
                        xml.push_str(">\n");
                        xml.push_str(&format!(
                            "      <skipped message=\"{}\"/>\n",
                            escape_xml(message)
                        ));
                        xml.push_str("    </testcase>\n");
                    }
                }
            }

            xml.push_str("  </testsuite>\n");
        }

        xml.push_str("</testsuites>\n");

        xml
    }

    /// Write report to file
    pub fn write_to_file(report: &RunReport, format: ReportFormat, path: &Path) -> Result<()> {
        let content = Self::generate(report, format);
        let mut file = std::fs::File::create(path).map_err(|e| TestingError::ReportWrite {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        file.write_all(content.as_bytes())
            .map_err(|e| TestingError::ReportWrite {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        Ok(())
    }
}

fn push_system_out(xml: &mut String, test: &TestResult) {
    if let Some(output) = test.outcome.raw_output.as_deref().filter(|o| !o.is_empty()) {
        xml.push_str(&format!(
            "      <system-out>{}</system-out>\n",
            escape_xml(output)
        ));
    }
}

/// Escape special XML characters. Characters XML 1.0 cannot carry at all
/// (control codes captured from the interpreter) become U+FFFD.
fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\t' | '\n' | '\r' => escaped.push(c),
            c if c < '\u{20}' || c == '\u{FFFE}' || c == '\u{FFFF}' => {
                escaped.push(char::REPLACEMENT_CHARACTER)
            }
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::FileCoverage;
    use crate::identity::TestIdentity;
    use crate::protocol::{ExecutionOutcome, ScriptWarning};
    use std::time::Duration;
    use tempfile::TempDir;

    fn result(id: &str, outcome: ExecutionOutcome) -> TestResult {
        TestResult::new(&TestIdentity::parse(id).unwrap(), outcome.with_duration(10))
    }

    fn sample_report() -> RunReport {
        let results = vec![
            result("math.test.ahk::Math::Adds", ExecutionOutcome::passed()),
            result(
                "math.test.ahk::Math::Nested::Subtracts",
                ExecutionOutcome::failed("Error: Expected 5, got <3>"),
            ),
            result(
                "str.test.ahk::Strings::Concat",
                ExecutionOutcome::errored("Failed to start AutoHotkey: not found"),
            ),
            result("str.test.ahk::Strings::Pending", ExecutionOutcome::skipped("Cancelled")),
        ];
        let summary = RunSummary::from_results(&results, Duration::from_millis(1234));
        RunReport {
            results,
            summary,
            coverage: None,
            cancelled: false,
        }
    }

    #[test]
    fn test_json_output() {
        let report = sample_report();
        let json = ReportGenerator::generate_json(&report);

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["passed"], 1);
        assert_eq!(value["failed"], 1);
        assert_eq!(value["errored"], 1);
        assert_eq!(value["success"], false);
        assert_eq!(value["results"][1]["status"], "failed");
        assert_eq!(value["results"][1]["name"], "Math.Nested.Subtracts");
    }

    #[test]
    fn test_junit_output() {
        let report = sample_report();
        let xml = ReportGenerator::generate_junit(&report);

        assert!(xml.contains("<?xml version=\"1.0\""));
        assert!(xml.contains("tests=\"4\""));
        assert!(xml.contains("<testsuite name=\"math.test.ahk\" tests=\"2\" failures=\"1\" errors=\"0\""));
        assert!(xml.contains("<testsuite name=\"str.test.ahk\" tests=\"2\" failures=\"0\" errors=\"1\" skipped=\"1\""));
        assert!(xml.contains("classname=\"Math.Nested\""));
        assert!(xml.contains("<failure message=\"Error: Expected 5, got &lt;3&gt;\" type=\"Error\">"));
        assert!(xml.contains("<error message=\"Failed to start AutoHotkey: not found\">"));
        assert!(xml.contains("<skipped message=\"Cancelled\"/>"));
    }

    #[test]
    fn test_pretty_output() {
        let mut report = sample_report();
        report.coverage = Some(CoverageReport {
            line_coverage: 0.5,
            files: vec![FileCoverage {
                path: "lib.ahk".to_string(),
                line_coverage: 0.5,
                lines_covered: 2,
                lines_total: 4,
                statements: vec![0, 3],
            }],
        });
        let pretty = ReportGenerator::generate_pretty(&report);

        assert!(pretty.contains("TEST RESULTS"));
        assert!(pretty.contains("math.test.ahk (2 tests)"));
        assert!(pretty.contains("1 passed, 1 failed, 1 errored, 1 skipped"));
        assert!(pretty.contains("COVERAGE: 50.0% lines (2/4)"));
        assert!(pretty.contains("Expected 5, got <3>"));
        assert!(pretty.contains("Some tests failed."));
    }

    #[test]
    fn test_write_to_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("report.xml");

        ReportGenerator::write_to_file(&sample_report(), ReportFormat::Junit, &path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<testsuites"));

        let bad = temp.path().join("missing").join("report.xml");
        assert!(matches!(
            ReportGenerator::write_to_file(&sample_report(), ReportFormat::Json, &bad),
            Err(TestingError::ReportWrite { .. })
        ));
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("<test>"), "&lt;test&gt;");
        assert_eq!(escape_xml("a & b"), "a &amp; b");
        assert_eq!(escape_xml("\"quoted\""), "&quot;quoted&quot;");
    }

    #[test]
    fn test_escape_xml_replaces_control_characters() {
        assert_eq!(escape_xml("a\u{1b}[31mred\0"), "a\u{FFFD}[31mred\u{FFFD}");
        assert_eq!(escape_xml("tab\tline\r\n"), "tab\tline\r\n");
    }

    #[test]
    fn test_junit_output_drops_control_characters() {
        let results = vec![result(
            "math.test.ahk::Math::Colours",
            ExecutionOutcome::failed("Error: \u{1b}[31mboom\u{7}"),
        )];
        let summary = RunSummary::from_results(&results, Duration::from_millis(5));
        let report = RunReport {
            results,
            summary,
            coverage: None,
            cancelled: false,
        };

        let junit = ReportGenerator::generate_junit(&report);
        assert!(!junit.chars().any(|c| c < '\u{20}' && !matches!(c, '\t' | '\n' | '\r')));
        assert!(junit.contains("\u{FFFD}[31mboom\u{FFFD}"));
    }

    #[test]
    fn test_pretty_output_lists_warnings() {
        let mut outcome = ExecutionOutcome::passed();
        outcome.warnings.push(ScriptWarning {
            file: r"C:\t\a.ahk".to_string(),
            line: 11,
            message: "Unset var".to_string(),
        });
        let results = vec![result("a.test.ahk::A::Warns", outcome)];
        let summary = RunSummary::from_results(&results, Duration::from_millis(5));
        let report = RunReport {
            results,
            summary,
            coverage: None,
            cancelled: false,
        };

        let pretty = ReportGenerator::generate_pretty(&report);
        assert!(pretty.contains(r"warning: C:\t\a.ahk (12): Unset var"));
    }
}
