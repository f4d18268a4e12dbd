//! Configuration handling for ahkunit

pub mod defaults;
pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{find_config, load_config, load_config_from_dir, load_config_or_default};
pub use types::{Config, WarningMode};
pub use validation::validate_config;
