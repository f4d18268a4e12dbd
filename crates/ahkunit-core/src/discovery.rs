//! Test file discovery
//!
//! Walks a project tree and keeps files whose path relative to the root
//! matches the configured glob. Matching is case-insensitive so that
//! `Foo.Test.ahk` and `foo.test.ahk` are both picked up on Windows
//! checkouts.

use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::error::{DiscoveryError, Result};

/// Directories never descended into
const SKIPPED_DIRS: &[&str] = &["node_modules", "target"];

/// Compiled test file glob
#[derive(Debug, Clone)]
pub struct TestFileMatcher {
    pattern: Pattern,
}

impl TestFileMatcher {
    /// Compile a glob such as `**/*.test.ahk`
    pub fn new(glob: &str) -> Result<Self> {
        let pattern = Pattern::new(glob).map_err(|e| DiscoveryError::InvalidGlob {
            pattern: glob.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self { pattern })
    }

    /// Check a path relative to the discovery root
    pub fn matches(&self, relative: &Path) -> bool {
        let options = MatchOptions {
            case_sensitive: false,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        // Normalize separators so one glob works for Windows and Unix paths
        let normalized = relative.to_string_lossy().replace('\\', "/");
        self.pattern.matches_with(&normalized, options)
    }
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

/// Discover test files below `root`.
///
/// A file given directly is returned as-is, without glob matching.
pub fn discover_test_files(root: &Path, glob: &str) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(DiscoveryError::PathNotFound(root.to_path_buf()).into());
    }

    if root.is_file() {
        debug!(path = %root.display(), "discovery root is a single file");
        return Ok(vec![root.to_path_buf()]);
    }

    let matcher = TestFileMatcher::new(glob)?;
    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_skipped_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .strip_prefix(root)
                .map(|relative| matcher.matches(relative))
                .unwrap_or(false)
        })
        .map(|e| e.into_path())
        .collect();

    files.sort();
    info!(root = %root.display(), glob, count = files.len(), "discovered test files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    #[test]
    fn test_discovers_nested_test_files() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "math.test.ahk");
        touch(temp.path(), "lib/strings.test.ahk");
        touch(temp.path(), "lib/strings.ahk");

        let files = discover_test_files(temp.path(), "**/*.test.ahk").unwrap();
        assert_eq!(
            files,
            vec![
                temp.path().join("lib/strings.test.ahk"),
                temp.path().join("math.test.ahk"),
            ]
        );
    }

    #[test]
    fn test_glob_is_case_insensitive() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Parser.Test.AHK");

        let files = discover_test_files(temp.path(), "**/*.test.ahk").unwrap();
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn test_skips_hidden_and_vendor_dirs() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), ".git/hooks.test.ahk");
        touch(temp.path(), "node_modules/pkg/a.test.ahk");
        touch(temp.path(), "src/b.test.ahk");

        let files = discover_test_files(temp.path(), "**/*.test.ahk").unwrap();
        assert_eq!(files, vec![temp.path().join("src/b.test.ahk")]);
    }

    #[test]
    fn test_single_file_root() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "anything.ahk");

        let file = temp.path().join("anything.ahk");
        let files = discover_test_files(&file, "**/*.test.ahk").unwrap();
        assert_eq!(files, vec![file]);
    }

    #[test]
    fn test_missing_root() {
        let temp = TempDir::new().unwrap();
        let result = discover_test_files(&temp.path().join("nope"), "**/*.test.ahk");
        assert!(result.is_err());
    }

    #[test]
    fn test_matcher_normalizes_backslashes() {
        let matcher = TestFileMatcher::new("**/*.test.ahk").unwrap();
        assert!(matcher.matches(Path::new(r"lib\deep\x.test.ahk")));
        assert!(!matcher.matches(Path::new("lib/x.ahk")));
    }
}
