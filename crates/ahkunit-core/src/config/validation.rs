//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::Config;

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_glob(config)?;
    validate_limits(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_glob(config: &Config) -> Result<()> {
    if config.test_file_glob.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "test_file_glob".to_string(),
            message: "glob cannot be empty".to_string(),
        }
        .into());
    }

    if let Err(e) = glob::Pattern::new(&config.test_file_glob) {
        return Err(ConfigError::InvalidValue {
            field: "test_file_glob".to_string(),
            message: e.to_string(),
        }
        .into());
    }

    Ok(())
}

fn validate_limits(config: &Config) -> Result<()> {
    if config.jobs == Some(0) {
        return Err(ConfigError::InvalidValue {
            field: "jobs".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    if config.timeout_secs == Some(0) {
        return Err(ConfigError::InvalidValue {
            field: "timeout_secs".to_string(),
            message: "must be at least 1 second".to_string(),
        }
        .into());
    }

    if config.executable_path.as_os_str().is_empty() {
        return Err(ConfigError::InvalidValue {
            field: "executable_path".to_string(),
            message: "interpreter path cannot be empty".to_string(),
        }
        .into());
    }

    Ok(())
}
