//! Line coverage parsing and aggregation
//!
//! The runner script dumps every line the interpreter executed, grouped by
//! file:
//!
//! ```text
//! ---- C:\project\lib\Wand.ahk
//! 178: this.ThrowForWarnings := false
//! 000: Super.__Init()
//! > free-text note
//! ```
//!
//! Record numbers are one-based; they are stored zero-based. Raw line `0`
//! marks implicit code (static initializers, `__Init`) and is dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// File header: `---- <path>`
static FILE_HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---- (?P<path>.*)$").expect("Invalid regex"));

/// Line record: `<digits>: <source>`
static LINE_RECORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<line>\d+): (?P<code>.*)$").expect("Invalid regex"));

/// Executed lines per file, zero-based
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CoverageMap {
    files: BTreeMap<String, BTreeSet<u32>>,
}

/// Classification of one trimmed coverage line. File headers are tried
/// before line records.
#[derive(Debug, PartialEq, Eq)]
enum CoverageLine<'a> {
    Annotation,
    FileHeader(&'a str),
    Record(u64),
    Other,
}

impl<'a> CoverageLine<'a> {
    fn classify(line: &'a str) -> Self {
        if line.starts_with('>') {
            return Self::Annotation;
        }
        if let Some(caps) = FILE_HEADER_REGEX.captures(line) {
            return caps
                .name("path")
                .map(|m| Self::FileHeader(m.as_str()))
                .unwrap_or(Self::Other);
        }
        if let Some(caps) = LINE_RECORD_REGEX.captures(line) {
            // Absurdly long digit runs are treated as malformed
            return caps["line"]
                .parse()
                .map(Self::Record)
                .unwrap_or(Self::Other);
        }
        Self::Other
    }
}

/// Accumulator threaded through a single pass over a coverage section
#[derive(Default)]
struct ParseState {
    map: CoverageMap,
    current_file: Option<String>,
}

impl ParseState {
    fn step(mut self, line: &str) -> Self {
        match CoverageLine::classify(line) {
            CoverageLine::FileHeader(path) => {
                self.map.files.entry(path.to_string()).or_default();
                self.current_file = Some(path.to_string());
            }
            CoverageLine::Record(raw) => {
                // One-based on the wire; raw 0 is implicit code
                let Some(zero_based) = raw.checked_sub(1) else {
                    return self;
                };
                if let (Some(file), Ok(line)) = (&self.current_file, u32::try_from(zero_based)) {
                    self.map.record(file.clone(), line);
                }
            }
            CoverageLine::Annotation | CoverageLine::Other => {}
        }
        self
    }
}

impl CoverageMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the body of one coverage section. Never fails; malformed input
    /// yields an empty or partial map.
    pub fn parse(section: &str) -> Self {
        let state = section
            .lines()
            .map(str::trim)
            .fold(ParseState::default(), ParseState::step);

        debug!(files = state.map.len(), "parsed coverage section");
        state.map
    }

    /// Record a zero-based executed line
    pub fn record(&mut self, file: impl Into<String>, line: u32) {
        self.files.entry(file.into()).or_default().insert(line);
    }

    /// Executed lines for a file
    pub fn lines(&self, file: &str) -> Option<&BTreeSet<u32>> {
        self.files.get(file)
    }

    /// Iterate files and their executed lines
    pub fn files(&self) -> impl Iterator<Item = (&String, &BTreeSet<u32>)> {
        self.files.iter()
    }

    /// Number of files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Union another map into this one, file by file
    pub fn merge(&mut self, other: &CoverageMap) {
        for (file, lines) in &other.files {
            self.files
                .entry(file.clone())
                .or_default()
                .extend(lines.iter().copied());
        }
    }
}

/// Merge many per-execution maps. Order does not matter.
pub fn merge_all<'a>(maps: impl IntoIterator<Item = &'a CoverageMap>) -> CoverageMap {
    maps.into_iter().fold(CoverageMap::new(), |mut acc, map| {
        acc.merge(map);
        acc
    })
}

/// Coverage for a single file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCoverage {
    /// File path
    pub path: String,
    /// Line coverage ratio (0.0 - 1.0)
    pub line_coverage: f64,
    /// Executed lines
    pub lines_covered: usize,
    /// Executable lines in the file
    pub lines_total: usize,
    /// Executed zero-based lines, ascending
    pub statements: Vec<u32>,
}

/// Coverage for a whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageReport {
    /// Overall line coverage ratio (0.0 - 1.0)
    pub line_coverage: f64,
    /// Per-file coverage
    pub files: Vec<FileCoverage>,
}

impl CoverageReport {
    pub fn lines_covered(&self) -> usize {
        self.files.iter().map(|f| f.lines_covered).sum()
    }

    pub fn lines_total(&self) -> usize {
        self.files.iter().map(|f| f.lines_total).sum()
    }
}

fn ratio(covered: usize, total: usize) -> f64 {
    if total > 0 {
        covered as f64 / total as f64
    } else {
        0.0
    }
}

/// Run-scoped coverage, keyed by test id.
///
/// Each finished test hands over its map once; the aggregator never edits a
/// recorded map, it only unions them when asked for a report.
#[derive(Debug, Default)]
pub struct CoverageAggregator {
    per_test: HashMap<String, CoverageMap>,
}

impl CoverageAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of one test's coverage
    pub fn record(&mut self, test_id: impl Into<String>, coverage: CoverageMap) {
        self.per_test.insert(test_id.into(), coverage);
    }

    /// Number of tests with recorded coverage
    pub fn len(&self) -> usize {
        self.per_test.len()
    }

    pub fn is_empty(&self) -> bool {
        self.per_test.is_empty()
    }

    /// Union of every recorded map
    pub fn merged(&self) -> CoverageMap {
        merge_all(self.per_test.values())
    }

    /// Build the per-file report, reading each source file from disk to
    /// count its executable lines
    pub fn report(&self) -> CoverageReport {
        self.report_with(|path| match std::fs::read_to_string(path) {
            Ok(text) => count_executable_lines(&text),
            Err(e) => {
                warn!(path, error = %e, "could not read covered file");
                0
            }
        })
    }

    /// Build the per-file report with a custom executable-line counter.
    ///
    /// Files under a temporary directory (the generated runner scripts) are
    /// left out.
    pub fn report_with(&self, total_lines: impl Fn(&str) -> usize) -> CoverageReport {
        let merged = self.merged();
        let files: Vec<FileCoverage> = merged
            .files()
            .filter(|(path, _)| !is_temp_path(path))
            .map(|(path, lines)| {
                let lines_total = total_lines(path);
                let lines_covered = lines.len();
                FileCoverage {
                    path: path.clone(),
                    line_coverage: ratio(lines_covered, lines_total),
                    lines_covered,
                    lines_total,
                    statements: lines.iter().copied().collect(),
                }
            })
            .collect();

        let covered: usize = files.iter().map(|f| f.lines_covered).sum();
        let total: usize = files.iter().map(|f| f.lines_total).sum();

        CoverageReport {
            line_coverage: ratio(covered, total),
            files,
        }
    }
}

/// Whether a covered file lives in a temporary directory
pub fn is_temp_path(path: &str) -> bool {
    if path.contains(r"\Temp\") || path.contains("/tmp/") {
        return true;
    }
    let temp_dir = std::env::temp_dir();
    Path::new(path).starts_with(&temp_dir)
}

/// Count lines that can execute: non-blank, not a `;` comment, not a `#`
/// directive, and not inside a `/* */` block.
///
/// A block opens on a line starting with `/*` and closes on a line ending
/// with `*/`.
pub fn count_executable_lines(text: &str) -> usize {
    let mut count = 0;
    let mut in_block_comment = false;

    for line in text.lines() {
        let trimmed = line.trim();

        if in_block_comment {
            if trimmed.ends_with("*/") {
                in_block_comment = false;
            }
            continue;
        }

        if trimmed.starts_with("/*") {
            in_block_comment = true;
            continue;
        }

        if !trimmed.is_empty() && !trimmed.starts_with(';') && !trimmed.starts_with('#') {
            count += 1;
        }
    }

    count
}

#[cfg(test)]
mod tests {
    use super::*;

    const WAND: &str = r"c:\Users\me\Lib\ImageMagick\Wand\MagickWand.ahk";
    const TEMP_SCRIPT: &str =
        r"C:\Users\me\AppData\Local\Temp\ahkunit-Smoke.WriteImage.temp.ahk";

    fn set(lines: &[u32]) -> BTreeSet<u32> {
        lines.iter().copied().collect()
    }

    #[test]
    fn test_single_file_and_statement() {
        let section = format!("\n        ---- {TEMP_SCRIPT}\n        013: Smoke().WriteImage()\n        ");
        let map = CoverageMap::parse(&section);

        assert_eq!(map.len(), 1);
        assert_eq!(map.lines(TEMP_SCRIPT), Some(&set(&[12])));
    }

    #[test]
    fn test_skips_implicit_lines() {
        let section = format!("---- {WAND}\n000: Super.__Init()\n178: this.ThrowForWarnings := false\n000: }}\n");
        let map = CoverageMap::parse(&section);

        assert_eq!(map.lines(WAND), Some(&set(&[177])));
    }

    #[test]
    fn test_duplicate_records_are_idempotent() {
        let section = format!("---- {WAND}\n178: this.ThrowForWarnings := false\n178: this.ThrowForWarnings := false\n");
        let map = CoverageMap::parse(&section);

        assert_eq!(map.lines(WAND), Some(&set(&[177])));
    }

    #[test]
    fn test_multiple_files() {
        let section = format!("---- {TEMP_SCRIPT}\n013: Smoke().WriteImage()\n---- C:\\lib\\Smoke.test.ahk\n041: wand := MagickWand()\n");
        let map = CoverageMap::parse(&section);

        assert_eq!(map.len(), 2);
        assert_eq!(map.lines(TEMP_SCRIPT), Some(&set(&[12])));
        assert_eq!(map.lines(r"C:\lib\Smoke.test.ahk"), Some(&set(&[40])));
    }

    #[test]
    fn test_recurring_file_accumulates() {
        let section = format!(
            "---- {WAND}\n845: If (x is String)\n846: y()\n849: }}\n854: z()\n1115: t := 1\n\
             ---- C:\\lib\\MagickExceptionType.ahk\n083: Return 400\n\
             ---- {WAND}\n1116: e := 1\n1084: Return 1\n1118: If (e > t)\n1124: }}\n855: Return this\n"
        );
        let map = CoverageMap::parse(&section);

        assert_eq!(map.len(), 2);
        assert_eq!(
            map.lines(WAND),
            Some(&set(&[844, 845, 848, 853, 1114, 1115, 1083, 1117, 1123, 854]))
        );
        assert_eq!(map.lines(r"C:\lib\MagickExceptionType.ahk"), Some(&set(&[82])));
    }

    #[test]
    fn test_header_without_records_keeps_file() {
        let map = CoverageMap::parse("---- C:\\a.ahk\n---- C:\\b.ahk\n001: x\n");
        assert_eq!(map.lines(r"C:\a.ahk"), Some(&BTreeSet::new()));
        assert_eq!(map.lines(r"C:\b.ahk"), Some(&set(&[0])));
    }

    #[test]
    fn test_records_before_header_and_annotations_ignored() {
        let map = CoverageMap::parse("012: orphan\n> note\n---- C:\\a.ahk\n> 005: not a record\n\n006: real\n");
        assert_eq!(map.len(), 1);
        assert_eq!(map.lines(r"C:\a.ahk"), Some(&set(&[5])));
    }

    #[test]
    fn test_empty_and_malformed_inputs() {
        assert!(CoverageMap::parse("").is_empty());
        assert!(CoverageMap::parse("Ooglyboogly").is_empty());
        assert!(CoverageMap::parse("----\n99999999999999999999999: x").is_empty());
    }

    #[test]
    fn test_crlf_input() {
        let map = CoverageMap::parse("---- C:\\a.ahk\r\n013: x\r\n");
        assert_eq!(map.lines(r"C:\a.ahk"), Some(&set(&[12])));
    }

    #[test]
    fn test_merge_is_commutative() {
        let e1 = CoverageMap::parse("---- C:\\a.ahk\n001: x\n002: y\n---- C:\\b.ahk\n010: z\n");
        let e2 = CoverageMap::parse("---- C:\\a.ahk\n002: y\n005: w\n---- C:\\c.ahk\n003: v\n");

        let forward = merge_all([&e1, &e2]);
        let backward = merge_all([&e2, &e1]);

        assert_eq!(forward, backward);
        assert_eq!(forward.lines(r"C:\a.ahk"), Some(&set(&[0, 1, 4])));
        assert_eq!(forward.len(), 3);
    }

    #[test]
    fn test_aggregator_report_excludes_temp_files() {
        let mut aggregator = CoverageAggregator::new();
        aggregator.record(
            "a::T::One",
            CoverageMap::parse(&format!("---- {TEMP_SCRIPT}\n013: x\n---- C:\\proj\\lib.ahk\n002: a\n004: b\n")),
        );
        aggregator.record(
            "a::T::Two",
            CoverageMap::parse("---- C:\\proj\\lib.ahk\n004: b\n009: c\n"),
        );

        let report = aggregator.report_with(|_| 10);

        assert_eq!(report.files.len(), 1);
        let file = &report.files[0];
        assert_eq!(file.path, r"C:\proj\lib.ahk");
        assert_eq!(file.lines_covered, 3);
        assert_eq!(file.lines_total, 10);
        assert_eq!(file.statements, vec![1, 3, 8]);
        assert!((report.line_coverage - 0.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_aggregator_keeps_per_test_maps() {
        let mut aggregator = CoverageAggregator::new();
        aggregator.record("f::A::M", CoverageMap::parse("---- C:\\x.ahk\n001: a\n"));
        // A test that runs again replaces its earlier map
        aggregator.record("f::A::M", CoverageMap::parse("---- C:\\x.ahk\n002: b\n"));

        assert_eq!(aggregator.len(), 1);
        assert_eq!(aggregator.merged().lines(r"C:\x.ahk"), Some(&set(&[1])));
    }

    #[test]
    fn test_count_executable_lines() {
        let text = "#Requires AutoHotkey v2.0\n\n; comment\nx := 1\n/* block\n   still block\n*/\ny := 2\n  ; indented comment\nclass A {\n}\n";
        assert_eq!(count_executable_lines(text), 4);
    }

    #[test]
    fn test_is_temp_path() {
        assert!(is_temp_path(TEMP_SCRIPT));
        assert!(is_temp_path("/tmp/ahkunit-A.M.temp.ahk"));
        assert!(!is_temp_path(WAND));
    }
}
