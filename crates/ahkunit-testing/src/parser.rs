//! Test tree parser
//!
//! Recovers the class/method hierarchy of an AutoHotkey v2 test file using
//! line-level regex matching plus brace-depth counting. This is deliberately
//! not a real AutoHotkey parser: it only understands enough declaration
//! syntax to find test classes and their zero-argument methods.
//!
//! ## Recognized forms
//!
//! ```text
//! class Name [extends Base] [{]      class declaration, brace optional
//! Name() {                           method with a block body
//! Name() => expr                     single-line fat-arrow method
//! Name()                             bare declaration (body may follow on a `{` line)
//! ;@ahkunit-ignore                   exclude the next declaration
//! ```
//!
//! ## Known limitation
//!
//! Brace matching counts every `{` and `}` character, including ones inside
//! string literals and comments, so such text can shift the end of a class
//! or method body. Fat-arrow methods spanning several lines are not
//! supported either.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Comment marker that excludes the next class or method from the tree
pub const IGNORE_MARKER: &str = ";@ahkunit-ignore";

/// Class declaration: `class Name [extends Base] [{]`
static CLASS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*class\s+(?P<name>\w+)(?:\s+extends\s+\w+)?\s*(?P<brace>\{)?\s*$")
        .expect("Invalid regex")
});

/// Method declaration with an empty parameter list.
///
/// The required `()` keeps property getters such as `Prop => value` out.
static METHOD_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?P<name>\w+)\s*\(\s*\)\s*(?:(?P<brace>\{)|(?P<arrow>=>).*)?$")
        .expect("Invalid regex")
});

/// A test method (leaf of the test tree)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMethodNode {
    pub name: String,
    /// Zero-based declaration line
    pub line: Option<u32>,
}

/// A class block containing test methods and nested classes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestClassNode {
    pub name: String,
    /// Zero-based declaration line
    pub line: Option<u32>,
    pub methods: Vec<TestMethodNode>,
    pub children: Vec<TestClassNode>,
}

impl TestClassNode {
    fn new(name: impl Into<String>, line: usize) -> Self {
        Self {
            name: name.into(),
            line: u32::try_from(line).ok(),
            methods: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Number of test methods in this class and all nested classes
    pub fn test_count(&self) -> usize {
        self.methods.len() + self.children.iter().map(|c| c.test_count()).sum::<usize>()
    }
}

/// Parse a test file into its top-level test classes.
///
/// Never fails: unrecognized or malformed text is skipped line by line, so
/// a broken file yields a partial (possibly empty) tree. Classes that end up
/// with no methods and no non-empty nested classes are dropped.
pub fn parse_test_file(content: &str) -> Vec<TestClassNode> {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();

    let parser = SourceParser { lines: &lines };
    let classes = prune_empty_classes(parser.parse_top_level());

    debug!(
        lines = lines.len(),
        classes = classes.len(),
        tests = classes.iter().map(|c| c.test_count()).sum::<usize>(),
        "parsed test file"
    );
    classes
}

/// How a matched method's body extends past its declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodBody {
    /// `{ ... }` ending on this line
    Block { end_line: usize },
    /// `=> expr` on the declaration line
    FatArrow,
    /// No body found
    Bare,
}

/// Classification of a single line, tried in order:
/// ignore marker, class declaration, method declaration.
#[derive(Debug)]
enum LineKind {
    IgnoreMarker,
    Class { node: TestClassNode, end_line: usize },
    Method { name: String, body: MethodBody },
    Text,
}

struct SourceParser<'a> {
    lines: &'a [&'a str],
}

impl SourceParser<'_> {
    fn parse_top_level(&self) -> Vec<TestClassNode> {
        let mut classes = Vec::new();
        let mut ignore_next = false;
        let mut i = 0;

        while i < self.lines.len() {
            match self.classify(i, false) {
                LineKind::IgnoreMarker => {
                    ignore_next = true;
                    i += 1;
                }
                LineKind::Class { node, end_line } => {
                    if !ignore_next {
                        classes.push(node);
                    }
                    ignore_next = false;
                    i = end_line + 1;
                }
                LineKind::Method { .. } | LineKind::Text => i += 1,
            }
        }

        classes
    }

    /// Parse the lines strictly between a class's braces into `cls`
    fn parse_class_interior(&self, start: usize, end: usize, cls: &mut TestClassNode) {
        let mut ignore_next = false;
        let mut i = start;

        while i < end {
            match self.classify(i, true) {
                LineKind::IgnoreMarker => {
                    ignore_next = true;
                    i += 1;
                }
                LineKind::Class { node, end_line } => {
                    if !ignore_next {
                        cls.children.push(node);
                    }
                    ignore_next = false;
                    i = end_line + 1;
                }
                LineKind::Method { name, body } => {
                    if !name.starts_with('_') && !ignore_next {
                        cls.methods.push(TestMethodNode {
                            name,
                            line: u32::try_from(i).ok(),
                        });
                    }
                    ignore_next = false;
                    i = match body {
                        MethodBody::Block { end_line } => end_line + 1,
                        MethodBody::FatArrow | MethodBody::Bare => i + 1,
                    };
                }
                LineKind::Text => i += 1,
            }
        }
    }

    fn classify(&self, index: usize, allow_methods: bool) -> LineKind {
        let line = self.lines[index];

        if line.trim().contains(IGNORE_MARKER) {
            return LineKind::IgnoreMarker;
        }

        if let Some((node, end_line)) = self.try_parse_class(index) {
            return LineKind::Class { node, end_line };
        }

        if allow_methods {
            if let Some(caps) = METHOD_REGEX.captures(line) {
                let name = caps["name"].to_string();
                let body = if caps.name("arrow").is_some() {
                    MethodBody::FatArrow
                } else {
                    let open_line = if caps.name("brace").is_some() {
                        Some(index)
                    } else {
                        self.find_opening_brace(index + 1)
                    };
                    match open_line {
                        Some(open) => MethodBody::Block {
                            end_line: self.find_matching_brace(open),
                        },
                        None => MethodBody::Bare,
                    }
                };
                return LineKind::Method { name, body };
            }
        }

        LineKind::Text
    }

    /// Try to parse a class declared at `start`, returning it with its closing line
    fn try_parse_class(&self, start: usize) -> Option<(TestClassNode, usize)> {
        let caps = CLASS_REGEX.captures(self.lines[start])?;

        let open_line = if caps.name("brace").is_some() {
            start
        } else {
            self.find_opening_brace(start + 1)?
        };
        let close_line = self.find_matching_brace(open_line);

        let mut cls = TestClassNode::new(&caps["name"], start);
        self.parse_class_interior(open_line + 1, close_line, &mut cls);

        Some((cls, close_line))
    }

    /// Find a line that is exactly `{`, skipping blank lines only
    fn find_opening_brace(&self, start: usize) -> Option<usize> {
        for (offset, line) in self.lines.iter().enumerate().skip(start) {
            match line.trim() {
                "{" => return Some(offset),
                "" => continue,
                _ => return None,
            }
        }
        None
    }

    /// Find the line where the brace opened on `open_line` closes.
    ///
    /// Counts raw characters with no knowledge of strings or comments. An
    /// unclosed brace runs to the last line of the file.
    fn find_matching_brace(&self, open_line: usize) -> usize {
        let mut depth: i64 = 0;

        for (index, line) in self.lines.iter().enumerate().skip(open_line) {
            for ch in line.chars() {
                match ch {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            return index;
                        }
                    }
                    _ => {}
                }
            }
        }

        self.lines.len().saturating_sub(1)
    }
}

/// Drop classes without methods or surviving children, bottom-up
fn prune_empty_classes(classes: Vec<TestClassNode>) -> Vec<TestClassNode> {
    classes
        .into_iter()
        .filter_map(|mut cls| {
            cls.children = prune_empty_classes(std::mem::take(&mut cls.children));
            (!cls.methods.is_empty() || !cls.children.is_empty()).then_some(cls)
        })
        .collect()
}
