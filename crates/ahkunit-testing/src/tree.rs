//! Test tree registration
//!
//! Files, classes and methods become [`TestItem`]s whose ids are built by
//! appending `::<name>` to the parent's id, so a method id is always a valid
//! [`TestIdentity`].

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TestingError};
use crate::identity::{TestIdentity, ID_SEPARATOR};
use crate::parser::{parse_test_file, TestClassNode};

/// Kind of node in the test tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestItemKind {
    File,
    Class,
    Method,
}

/// A registered file, class or test method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestItem {
    pub id: String,
    pub label: String,
    pub kind: TestItemKind,
    /// Zero-based declaration line (files have none)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub children: Vec<TestItem>,
}

impl TestItem {
    fn new(id: String, label: &str, kind: TestItemKind, line: Option<u32>) -> Self {
        Self {
            id,
            label: label.to_string(),
            kind,
            line,
            children: Vec::new(),
        }
    }

    /// Whether this item is a runnable test
    pub fn is_leaf(&self) -> bool {
        self.kind == TestItemKind::Method
    }

    /// Number of tests at or below this item
    pub fn test_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(TestItem::test_count).sum()
        }
    }

    /// Find an item by id at or below this one
    pub fn find(&self, id: &str) -> Option<&TestItem> {
        if self.id == id {
            return Some(self);
        }
        // Ids are prefixes of their descendants' ids
        if !id.starts_with(&self.id) {
            return None;
        }
        self.children.iter().find_map(|child| child.find(id))
    }
}

fn class_item(parent_id: &str, class: &TestClassNode) -> TestItem {
    let id = format!("{}{}{}", parent_id, ID_SEPARATOR, class.name);
    let mut item = TestItem::new(id, &class.name, TestItemKind::Class, class.line);

    for method in &class.methods {
        let method_id = format!("{}{}{}", item.id, ID_SEPARATOR, method.name);
        item.children.push(TestItem::new(
            method_id,
            &method.name,
            TestItemKind::Method,
            method.line,
        ));
    }
    for child in &class.children {
        let child_item = class_item(&item.id, child);
        item.children.push(child_item);
    }

    item
}

/// Walk down from `item`, collecting every test below it
fn collect_leaves(item: &TestItem, file: &str, classes: &mut Vec<String>, out: &mut Vec<TestIdentity>) {
    match item.kind {
        TestItemKind::Method => {
            out.push(TestIdentity::new(file, classes.clone(), item.label.as_str()));
        }
        TestItemKind::File => {
            for child in &item.children {
                collect_leaves(child, file, classes, out);
            }
        }
        TestItemKind::Class => {
            classes.push(item.label.clone());
            for child in &item.children {
                collect_leaves(child, file, classes, out);
            }
            classes.pop();
        }
    }
}

/// All registered test files
#[derive(Debug, Clone, Default, Serialize)]
pub struct TestTree {
    files: Vec<TestItem>,
}

impl TestTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the parsed classes of one file, replacing any earlier
    /// registration of the same file
    pub fn register_file(&mut self, file: &str, classes: &[TestClassNode]) -> &TestItem {
        let label = Path::new(file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.to_string());

        let mut item = TestItem::new(file.to_string(), &label, TestItemKind::File, None);
        item.children = classes.iter().map(|class| class_item(file, class)).collect();

        debug!(file, tests = item.test_count(), "registered test file");

        let index = match self.files.iter().position(|f| f.id == file) {
            Some(index) => {
                self.files[index] = item;
                index
            }
            None => {
                self.files.push(item);
                self.files.len() - 1
            }
        };
        &self.files[index]
    }

    /// Read, parse and register a test file
    pub fn load_file(&mut self, path: &Path) -> Result<&TestItem> {
        let content = std::fs::read_to_string(path).map_err(|source| TestingError::SourceRead {
            path: path.to_path_buf(),
            source,
        })?;
        let classes = parse_test_file(&content);
        Ok(self.register_file(&path.display().to_string(), &classes))
    }

    pub fn files(&self) -> &[TestItem] {
        &self.files
    }

    pub fn get(&self, id: &str) -> Option<&TestItem> {
        self.files.iter().find_map(|f| f.find(id))
    }

    /// Total number of tests
    pub fn test_count(&self) -> usize {
        self.files.iter().map(TestItem::test_count).sum()
    }

    /// Every test in registration order
    pub fn leaves(&self) -> Vec<TestIdentity> {
        let mut out = Vec::new();
        for file in &self.files {
            collect_leaves(file, &file.id, &mut Vec::new(), &mut out);
        }
        out
    }

    /// Tests below the requested items. Unknown ids are reported as errors.
    pub fn collect(&self, ids: &[&str]) -> Result<Vec<TestIdentity>> {
        let mut out = Vec::new();
        for id in ids {
            let (file, item) = self
                .files
                .iter()
                .find_map(|f| f.find(id).map(|item| (f, item)))
                .ok_or_else(|| TestingError::invalid_id(*id, "no such test"))?;

            // Class names between the file and the requested item; the
            // item's own name is pushed again while walking it
            let mut ancestors: Vec<String> = item.id[file.id.len()..]
                .split(ID_SEPARATOR)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
            ancestors.pop();

            collect_leaves(item, &file.id, &mut ancestors, &mut out);
        }

        let mut seen = HashSet::new();
        out.retain(|identity| seen.insert(identity.clone()));
        Ok(out)
    }

    /// Tests whose id contains `pattern`
    pub fn filter(&self, pattern: &str) -> Vec<TestIdentity> {
        self.leaves()
            .into_iter()
            .filter(|identity| identity.to_string().contains(pattern))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SOURCE: &str = r#"class MathTests {
    Adds() {
    }

    class Nested {
        Subtracts() {
        }
    }
}

class StringTests {
    Concats() => "a" "b"
}
"#;

    fn tree() -> TestTree {
        let mut tree = TestTree::new();
        tree.register_file("/repo/math.test.ahk", &parse_test_file(SOURCE));
        tree
    }

    #[test]
    fn test_ids_are_concatenated() {
        let tree = tree();
        let file = &tree.files()[0];
        assert_eq!(file.label, "math.test.ahk");
        assert_eq!(file.kind, TestItemKind::File);

        let nested = tree.get("/repo/math.test.ahk::MathTests::Nested").unwrap();
        assert_eq!(nested.kind, TestItemKind::Class);
        assert_eq!(nested.line, Some(4));
        assert_eq!(
            nested.children[0].id,
            "/repo/math.test.ahk::MathTests::Nested::Subtracts"
        );
        assert_eq!(nested.children[0].line, Some(5));
    }

    #[test]
    fn test_leaves() {
        let leaves: Vec<String> = tree().leaves().iter().map(|l| l.to_string()).collect();
        assert_eq!(
            leaves,
            vec![
                "/repo/math.test.ahk::MathTests::Adds",
                "/repo/math.test.ahk::MathTests::Nested::Subtracts",
                "/repo/math.test.ahk::StringTests::Concats",
            ]
        );
        assert_eq!(tree().test_count(), 3);
    }

    #[test]
    fn test_collect_class_and_method() {
        let tree = tree();
        let collected = tree
            .collect(&[
                "/repo/math.test.ahk::MathTests::Nested",
                "/repo/math.test.ahk::StringTests::Concats",
            ])
            .unwrap();

        assert_eq!(collected.len(), 2);
        assert_eq!(collected[0].classes, vec!["MathTests", "Nested"]);
        assert_eq!(collected[0].method, "Subtracts");
        assert_eq!(collected[1].call_chain(), "StringTests().Concats()");
    }

    #[test]
    fn test_collect_file() {
        let collected = tree().collect(&["/repo/math.test.ahk"]).unwrap();
        assert_eq!(collected.len(), 3);
    }

    #[test]
    fn test_collect_unknown_id() {
        assert!(tree().collect(&["/repo/math.test.ahk::Missing"]).is_err());
    }

    #[test]
    fn test_filter() {
        let filtered = tree().filter("Nested");
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].display_name(), "MathTests.Nested.Subtracts");
    }

    #[test]
    fn test_reregister_replaces_file() {
        let mut tree = tree();
        tree.register_file("/repo/math.test.ahk", &parse_test_file("class Only {\n    One() {\n    }\n}\n"));
        assert_eq!(tree.files().len(), 1);
        assert_eq!(tree.test_count(), 1);
    }

    #[test]
    fn test_load_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.test.ahk");
        std::fs::write(&path, SOURCE).unwrap();

        let mut tree = TestTree::new();
        let item = tree.load_file(&path).unwrap();
        assert_eq!(item.id, path.display().to_string());
        assert_eq!(item.test_count(), 3);

        assert!(matches!(
            tree.load_file(&temp.path().join("missing.test.ahk")),
            Err(TestingError::SourceRead { .. })
        ));
    }
}
