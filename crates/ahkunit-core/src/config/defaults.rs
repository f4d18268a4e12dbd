//! Default configuration values

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "ahkunit.yaml";

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "ahkunit.toml";

/// Default AutoHotkey v2 install location
pub const DEFAULT_EXECUTABLE_PATH: &str = r"C:\Program Files\AutoHotkey\v2\AutoHotkey64.exe";

/// Default glob for test files
pub const DEFAULT_TEST_FILE_GLOB: &str = "**/*.test.ahk";

/// Get list of config file names to search for
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_YAML,
        DEFAULT_CONFIG_TOML,
        ".ahkunit.yaml",
        ".ahkunit.toml",
    ]
}

/// Default configuration template
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# ahkunit configuration

# AutoHotkey v2 interpreter used to run each test
executable_path: 'C:\Program Files\AutoHotkey\v2\AutoHotkey64.exe'

# Test files, relative to this directory
test_file_glob: "**/*.test.ahk"

# Interpreter warnings: off | report | fail
warnings: off

# Per-test timeout in seconds (a native fault can leave the interpreter
# waiting on an error dialog forever)
# timeout_secs: 60

# Maximum number of tests run at once
# jobs: 8

# Custom runner template
# template_path: templates/test-runner.ahk
"#;
