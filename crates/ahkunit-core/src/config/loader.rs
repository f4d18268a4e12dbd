//! Configuration loading

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, Result};

use super::defaults::config_file_names;
use super::types::Config;
use super::validation::validate_config;

/// Load configuration from a file
pub fn load_config(path: &Path) -> Result<Config> {
    let format = if path.extension().is_some_and(|e| e == "toml") {
        "TOML"
    } else {
        "YAML"
    };
    info!(path = %path.display(), format, "loading config");

    let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

    let mut config: Config = if format == "TOML" {
        toml::from_str(&content).map_err(ConfigError::TomlError)?
    } else {
        serde_yaml::from_str(&content).map_err(ConfigError::YamlError)?
    };

    // A relative template path is relative to the config file, not the cwd
    if let (Some(template), Some(dir)) = (config.template_path.as_ref(), path.parent()) {
        if template.is_relative() {
            config.template_path = Some(dir.join(template));
        }
    }

    validate_config(&config)?;
    debug!(path = %path.display(), "config loaded and validated");
    Ok(config)
}

/// Find configuration file in directory or parent directories.
///
/// The first name from [`config_file_names`] found wins; parents are
/// walked until the filesystem root.
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    debug!(start_dir = %start_dir.display(), "searching for config file");
    let mut current = start_dir.to_path_buf();

    loop {
        for name in config_file_names() {
            let config_path = current.join(name);
            if config_path.exists() {
                info!(path = %config_path.display(), "found config file");
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    debug!("no config file found");
    None
}

/// Load configuration from directory (searching parent directories)
pub fn load_config_from_dir(dir: &Path) -> Result<(Config, PathBuf)> {
    let config_path = find_config(dir).ok_or_else(|| ConfigError::NotFound(dir.to_path_buf()))?;

    let config = load_config(&config_path)?;
    Ok((config, config_path))
}

/// Load configuration or use defaults.
///
/// Only a missing file falls back to defaults; a config that exists but
/// fails to parse or validate is an error.
pub fn load_config_or_default(dir: &Path) -> Result<(Config, Option<PathBuf>)> {
    match find_config(dir) {
        Some(path) => {
            let config = load_config(&path)?;
            Ok((config, Some(path)))
        }
        None => {
            warn!(dir = %dir.display(), "no config found, using defaults");
            Ok((Config::default(), None))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WarningMode;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_yaml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("ahkunit.yaml");
        std::fs::write(&config_path, "warnings: report\n").unwrap();

        let found = find_config(temp.path());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_prefers_yaml_over_toml() {
        let temp = TempDir::new().unwrap();
        let yaml_path = temp.path().join("ahkunit.yaml");
        let toml_path = temp.path().join("ahkunit.toml");
        std::fs::write(&yaml_path, "warnings: report\n").unwrap();
        std::fs::write(&toml_path, "warnings = \"fail\"\n").unwrap();

        let found = find_config(temp.path()).unwrap();
        assert_eq!(found, yaml_path);
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("tests").join("unit");
        std::fs::create_dir_all(&nested).unwrap();
        let config_path = temp.path().join(".ahkunit.toml");
        std::fs::write(&config_path, "jobs = 2\n").unwrap();

        let found = find_config(&nested).unwrap();
        assert_eq!(found, config_path);
    }

    #[test]
    fn test_load_config_toml() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("ahkunit.toml");
        std::fs::write(
            &config_path,
            "executable_path = 'D:\\AHK\\AutoHotkey64.exe'\nwarnings = \"fail\"\njobs = 4\n",
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.executable_path, PathBuf::from(r"D:\AHK\AutoHotkey64.exe"));
        assert_eq!(config.warnings, WarningMode::Fail);
        assert_eq!(config.jobs, Some(4));
    }

    #[test]
    fn test_load_config_resolves_template_relative_to_config() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("ahkunit.yaml");
        std::fs::write(&config_path, "template_path: templates/runner.ahk\n").unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(
            config.template_path,
            Some(temp.path().join("templates/runner.ahk"))
        );
    }

    #[test]
    fn test_load_config_rejects_zero_jobs() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("ahkunit.yaml");
        std::fs::write(&config_path, "jobs: 0\n").unwrap();

        assert!(load_config(&config_path).is_err());
    }

    #[test]
    fn test_load_config_or_default_without_file() {
        let temp = TempDir::new().unwrap();
        let (config, path) = load_config_or_default(temp.path()).unwrap();
        assert!(path.is_none());
        assert_eq!(config, Config::default());
    }
}
