//! Init command

use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use dialoguer::{Confirm, Select};
use tracing::info;

use ahkunit_core::config::defaults::{DEFAULT_CONFIG_TEMPLATE, DEFAULT_CONFIG_YAML};
use ahkunit_core::Config;

use crate::cli::{output, Cli};

/// Create an ahkunit configuration file
#[derive(Debug, Args)]
pub struct InitCommand {
    /// Force overwrite existing configuration
    #[arg(short, long)]
    pub force: bool,

    /// Use defaults without prompting
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Output file path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl InitCommand {
    /// Execute the init command
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(force = self.force, yes = self.yes, "executing init command");
        let cwd = std::env::current_dir()?;
        let config_path = self
            .output
            .clone()
            .unwrap_or_else(|| cwd.join(DEFAULT_CONFIG_YAML));

        // Check if config already exists
        if config_path.exists() && !self.force {
            if self.yes {
                anyhow::bail!(
                    "Configuration file already exists at {}. Use --force to overwrite.",
                    config_path.display()
                );
            }

            let overwrite = Confirm::new()
                .with_prompt(format!(
                    "Configuration file already exists at {}. Overwrite?",
                    config_path.display()
                ))
                .default(false)
                .interact()?;

            if !overwrite {
                println!("{}", style("Aborted.").yellow());
                return Ok(());
            }
        }

        // Choose format if not specified
        let format = if self.yes || is_toml(&config_path) {
            if is_toml(&config_path) {
                "toml"
            } else {
                "yaml"
            }
        } else {
            let formats = ["yaml", "toml"];
            let selection = Select::new()
                .with_prompt("Configuration format")
                .items(&formats)
                .default(0)
                .interact()?;
            formats[selection]
        };

        let config_path = if format == "toml" && !is_toml(&config_path) {
            config_path.with_extension("toml")
        } else {
            config_path
        };

        let content = render_config(format)?;
        std::fs::write(&config_path, &content)?;

        if !cli.quiet {
            output::success(&format!(
                "Created configuration at {}",
                output::path_style().apply_to(config_path.display())
            ));
            println!();
            println!("Next steps:");
            println!(
                "  1. Point {} at your AutoHotkey v2 interpreter",
                style("executable_path").cyan()
            );
            println!("  2. Run {} to see the discovered tests", style("ahkunit list").cyan());
            println!("  3. Run {} to run them", style("ahkunit test").cyan());
        }

        Ok(())
    }
}

fn is_toml(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "toml")
}

/// Default configuration in the requested format
fn render_config(format: &str) -> anyhow::Result<String> {
    if format == "toml" {
        // Convert the commented YAML template to TOML
        let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE)?;
        Ok(toml::to_string_pretty(&config)?)
    } else {
        Ok(DEFAULT_CONFIG_TEMPLATE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_template_round_trips() {
        let content = render_config("yaml").unwrap();
        let config: Config = serde_yaml::from_str(&content).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_toml_template_round_trips() {
        let content = render_config("toml").unwrap();
        let config: Config = toml::from_str(&content).unwrap();
        assert_eq!(config, Config::default());
        assert!(content.contains("test_file_glob"));
    }

    #[test]
    fn test_is_toml() {
        assert!(is_toml(Path::new("ahkunit.toml")));
        assert!(!is_toml(Path::new("ahkunit.yaml")));
    }
}
