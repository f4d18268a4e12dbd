//! Test identities
//!
//! A test is addressed by `<file>::<Class>[::<Nested>...]::<Method>`. The
//! separator is reserved: it may not appear inside the file locator or any
//! class or method name.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TestingError};

/// Separator between id segments
pub const ID_SEPARATOR: &str = "::";

/// Fully-qualified address of a single test method
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TestIdentity {
    /// File locator (the test file's path as registered)
    pub file: String,
    /// Enclosing classes, outermost first
    pub classes: Vec<String>,
    /// Test method name
    pub method: String,
}

impl TestIdentity {
    pub fn new(file: impl Into<String>, classes: Vec<String>, method: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            classes,
            method: method.into(),
        }
    }

    /// Split an id string back into its segments
    pub fn parse(id: &str) -> Result<Self> {
        let mut parts: Vec<&str> = id.split(ID_SEPARATOR).collect();
        if parts.len() < 3 {
            return Err(TestingError::invalid_id(
                id,
                "expected <file>::<Class>::<Method>",
            ));
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(TestingError::invalid_id(id, "empty segment"));
        }

        let method = parts.pop().unwrap_or_default().to_string();
        let file = parts.remove(0).to_string();
        let classes = parts.into_iter().map(str::to_string).collect();

        Ok(Self {
            file,
            classes,
            method,
        })
    }

    /// Directory containing the test file
    pub fn file_dir(&self) -> PathBuf {
        Path::new(&self.file)
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }

    /// Expression that instantiates the class chain and calls the method,
    /// e.g. `Outer.Inner().Test()`
    pub fn call_chain(&self) -> String {
        format!("{}().{}()", self.classes.join("."), self.method)
    }

    /// Dotted name without the file, e.g. `Outer.Inner.Test`
    pub fn display_name(&self) -> String {
        let mut segments = self.classes.clone();
        segments.push(self.method.clone());
        segments.join(".")
    }
}

impl fmt::Display for TestIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file)?;
        for class in &self.classes {
            write!(f, "{}{}", ID_SEPARATOR, class)?;
        }
        write!(f, "{}{}", ID_SEPARATOR, self.method)
    }
}

impl std::str::FromStr for TestIdentity {
    type Err = TestingError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
