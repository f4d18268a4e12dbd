//! List command

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use ahkunit_testing::{TestItem, TestItemKind, TestTree};

use super::{build_test_tree, load_project_config, resolve_path};
use crate::cli::{output, Cli, OutputFormat};

/// List discovered tests without running them
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Directory to search for test files
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Show item ids instead of labels
    #[arg(long)]
    pub ids: bool,
}

impl ListCommand {
    /// Execute the list command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(path = %self.path.display(), "executing list command");

        let config = load_project_config()?;
        let root = resolve_path(&self.path)?;
        let tree = build_test_tree(&root, &config)?;

        if cli.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(tree.files())?);
            return Ok(());
        }

        if cli.quiet {
            return Ok(());
        }

        if tree.files().is_empty() {
            output::warning(&format!(
                "No test files found in {}",
                output::path_style().apply_to(root.display())
            ));
            return Ok(());
        }

        println!("{}", output::header("Discovered tests"));
        println!();
        for line in self.render(&tree) {
            println!("{}", line);
        }
        println!();
        println!(
            "{}",
            output::key_value("Files", &tree.files().len().to_string())
        );
        println!(
            "{}",
            output::key_value("Tests", &tree.test_count().to_string())
        );

        Ok(())
    }

    /// One line per tree item, indented by depth
    fn render(&self, tree: &TestTree) -> Vec<String> {
        let mut lines = Vec::new();
        for file in tree.files() {
            self.render_item(file, 0, &mut lines);
        }
        lines
    }

    fn render_item(&self, item: &TestItem, depth: usize, lines: &mut Vec<String>) {
        let indent = "  ".repeat(depth);
        let name = if self.ids { &item.id } else { &item.label };
        let line = match item.kind {
            TestItemKind::File => format!(
                "{}{} ({} tests)",
                indent,
                output::path_style().apply_to(name),
                item.test_count()
            ),
            TestItemKind::Class => format!("{}{}", indent, style(name).bold()),
            // Lines are shown one-based
            TestItemKind::Method => match item.line {
                Some(line) => format!("{}{} {}", indent, name, style(format!(":{}", line + 1)).dim()),
                None => format!("{}{}", indent, name),
            },
        };
        lines.push(line);

        for child in &item.children {
            self.render_item(child, depth + 1, lines);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahkunit_testing::parse_test_file;

    fn command(ids: bool) -> ListCommand {
        ListCommand {
            path: PathBuf::from("."),
            ids,
        }
    }

    fn tree() -> TestTree {
        let source = "class Math {\n    Adds() {\n    }\n    class Nested {\n        Deep() => true\n    }\n}\n";
        let mut tree = TestTree::new();
        tree.register_file("math.test.ahk", &parse_test_file(source));
        tree
    }

    #[test]
    fn test_render_indents_by_depth() {
        console::set_colors_enabled(false);
        let lines = command(false).render(&tree());

        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("math.test.ahk"));
        assert!(lines[0].ends_with("(2 tests)"));
        assert_eq!(lines[1], "  Math");
        assert_eq!(lines[2], "    Adds :2");
        assert_eq!(lines[3], "    Nested");
        assert_eq!(lines[4], "      Deep :5");
    }

    #[test]
    fn test_render_ids() {
        console::set_colors_enabled(false);
        let lines = command(true).render(&tree());
        assert!(lines[4].trim_start().starts_with("math.test.ahk::Math::Nested::Deep"));
    }
}
