//! Exit codes for the CLI

use std::fmt;

use ahkunit_core::CoreError;
use ahkunit_testing::TestingError;

/// Success
pub const SUCCESS: i32 = 0;

/// General error, or at least one test failed or errored
pub const ERROR: i32 = 1;

/// Configuration error
pub const CONFIG_ERROR: i32 = 2;

/// User cancelled
pub const CANCELLED: i32 = 130;

/// Error that ends the process with a specific exit code
#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

/// Map a command error to the process exit code
pub fn for_error(error: &anyhow::Error) -> i32 {
    if let Some(exit) = error.downcast_ref::<ExitError>() {
        return exit.code;
    }
    if let Some(core) = error.downcast_ref::<CoreError>() {
        return if core.is_config_error() {
            CONFIG_ERROR
        } else {
            ERROR
        };
    }
    if let Some(testing) = error.downcast_ref::<TestingError>() {
        return testing.exit_code();
    }
    ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use ahkunit_core::ConfigError;

    #[test]
    fn test_exit_error_code() {
        let error = anyhow::Error::new(ExitError::new(CANCELLED, "Run cancelled"));
        assert_eq!(for_error(&error), CANCELLED);
    }

    #[test]
    fn test_config_error_code() {
        let error = anyhow::Error::new(CoreError::Config(ConfigError::InvalidValue {
            field: "jobs".to_string(),
            message: "must be greater than 0".to_string(),
        }));
        assert_eq!(for_error(&error), CONFIG_ERROR);

        let error = anyhow::Error::new(TestingError::TemplateMarkerMissing {
            marker: ";@ahkunit-call",
        });
        assert_eq!(for_error(&error), CONFIG_ERROR);
    }

    #[test]
    fn test_other_errors() {
        assert_eq!(for_error(&anyhow::anyhow!("boom")), ERROR);
    }
}
