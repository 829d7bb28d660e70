//! Config entry errors

use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    ParseYaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `!secret` names a key missing from secrets.yaml
    #[error("secret '{key}' not found in secrets.yaml")]
    SecretNotFound { key: String },

    /// `!env_var` names an unset variable
    #[error("environment variable '{var}' not set")]
    EnvVarNotFound { var: String },

    /// A tag whose argument is not a scalar name
    #[error("{tag} expects a name, got {found}")]
    TagArgument { tag: String, found: String },

    /// Entry field failed validation
    #[error("invalid value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },
}
