//! Setup errors

use hm_config::ConfigError;
use thiserror::Error;

/// Result type for integration setup
pub type SetupResult<T> = Result<T, SetupError>;

/// Errors that prevent an entry from being set up
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Invalid HiveMind configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("No HiveMind entries configured in {0}")]
    NoEntries(String),
}
