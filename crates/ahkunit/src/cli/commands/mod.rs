//! CLI commands

mod completions;
mod init;
mod list;

pub use completions::CompletionsCommand;
pub use init::InitCommand;
pub use list::ListCommand;
pub use test::TestCommand;

use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use ahkunit_core::{discover_test_files, load_config_or_default, Config};
use ahkunit_testing::TestTree;

/// Load the project configuration found from the current directory
pub(crate) fn load_project_config() -> anyhow::Result<Config> {
    let cwd = std::env::current_dir()?;
    let (config, path) = load_config_or_default(&cwd)?;
    match path {
        Some(path) => info!(path = %path.display(), "loaded configuration"),
        None => info!("no configuration file found, using defaults"),
    }
    Ok(config)
}

/// Resolve a path argument against the current directory.
///
/// The result is normalized because it becomes the prefix of every test id.
pub(crate) fn resolve_path(path: &Path) -> anyhow::Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize_path(path))
    } else {
        Ok(normalize_path(&std::env::current_dir()?.join(path)))
    }
}

/// Drop `.` segments and fold `..` into its parent without touching the
/// filesystem
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Discover and parse every test file under `root`.
///
/// Files that cannot be read are skipped with a warning.
pub(crate) fn build_test_tree(root: &Path, config: &Config) -> anyhow::Result<TestTree> {
    let files = discover_test_files(root, &config.test_file_glob)
        .with_context(|| format!("Failed to discover tests in {}", root.display()))?;

    let mut tree = TestTree::new();
    for file in &files {
        if let Err(e) = tree.load_file(file) {
            warn!(path = %file.display(), error = %e, "skipping unreadable test file");
        }
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/work/./tests/../suite/./a.test.ahk")),
            PathBuf::from("/work/suite/a.test.ahk")
        );
        assert_eq!(normalize_path(Path::new("/work/.")), PathBuf::from("/work"));
        assert_eq!(normalize_path(Path::new("../x")), PathBuf::from("../x"));
    }

    #[test]
    fn test_resolve_path_is_normalized() {
        let resolved = resolve_path(Path::new(".")).unwrap();
        assert!(resolved.is_absolute());
        assert!(!resolved
            .components()
            .any(|c| matches!(c, Component::CurDir | Component::ParentDir)));
    }

    #[test]
    fn test_tree_ids_use_plain_paths() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("math.test.ahk"),
            "class Math {\n    Adds() {\n    }\n}\n",
        )
        .unwrap();

        let root = resolve_path(&temp.path().join(".")).unwrap();
        let tree = build_test_tree(&root, &Config::default()).unwrap();

        let id = format!("{}::Math::Adds", temp.path().join("math.test.ahk").display());
        let leaves = tree.leaves();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].to_string(), id);

        let selected = tree.collect(&[id.as_str()]).unwrap();
        assert_eq!(selected, leaves);
    }
}
