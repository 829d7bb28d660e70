//! Entry file loading with credential tags
//!
//! - `!secret key` - value of `key` in secrets.yaml next to the entry file
//! - `!env_var VAR` - value of an environment variable
//!
//! Both substitute as strings. Any other tag is left in place and fails
//! later, when the entry is deserialized.

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::value::TaggedValue;
use serde_yaml::Value;
use tracing::{debug, trace};

use crate::error::{ConfigError, ConfigResult};
use crate::secrets::Secrets;

/// Resolves credential tags in entry files of one config directory
pub struct EntryLoader {
    config_dir: PathBuf,
    secrets: Secrets,
}

impl EntryLoader {
    /// Loader for `config_dir`, reading its secrets.yaml if present
    pub fn new(config_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let config_dir = config_dir.into();
        let secrets = Secrets::load(&config_dir)?;
        Ok(Self::with_secrets(config_dir, secrets))
    }

    pub fn with_secrets(config_dir: impl Into<PathBuf>, secrets: Secrets) -> Self {
        Self {
            config_dir: config_dir.into(),
            secrets,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Path of `file` relative to the config directory
    pub fn path_of(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.config_dir.join(file)
        }
    }

    /// Read `file` and resolve its tags
    pub fn load(&self, file: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = self.path_of(file.as_ref());
        debug!(path = ?path, "Loading entry file");

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::ReadFile {
            path: path.clone(),
            source,
        })?;
        self.parse(&content, &path)
    }

    /// Parse YAML text and resolve its tags
    pub fn parse(&self, content: &str, source: &Path) -> ConfigResult<Value> {
        let value: Value = serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
            path: source.to_path_buf(),
            source: e,
        })?;
        self.resolve(value)
    }

    fn resolve(&self, value: Value) -> ConfigResult<Value> {
        match value {
            Value::Tagged(tagged) => self.resolve_tag(*tagged),
            Value::Mapping(map) => map
                .into_iter()
                .map(|(k, v)| Ok((k, self.resolve(v)?)))
                .collect::<ConfigResult<serde_yaml::Mapping>>()
                .map(Value::Mapping),
            Value::Sequence(items) => items
                .into_iter()
                .map(|v| self.resolve(v))
                .collect::<ConfigResult<Vec<_>>>()
                .map(Value::Sequence),
            other => Ok(other),
        }
    }

    fn resolve_tag(&self, tagged: TaggedValue) -> ConfigResult<Value> {
        let tag = tagged.tag.to_string();
        trace!(tag = %tag, "Resolving tag");

        match tag.as_str() {
            "!secret" => {
                let key = tag_argument(&tag, tagged.value)?;
                let secret = self.secrets.get(&key)?;
                debug!(key = %key, "Substituted secret");
                Ok(Value::String(secret.to_string()))
            }
            "!env_var" => {
                let var = tag_argument(&tag, tagged.value)?;
                let value = std::env::var(&var)
                    .map_err(|_| ConfigError::EnvVarNotFound { var: var.clone() })?;
                debug!(var = %var, "Substituted environment variable");
                Ok(Value::String(value))
            }
            _ => Ok(Value::Tagged(Box::new(TaggedValue {
                tag: tagged.tag,
                value: self.resolve(tagged.value)?,
            }))),
        }
    }
}

fn tag_argument(tag: &str, value: Value) -> ConfigResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(ConfigError::TagArgument {
            tag: tag.to_string(),
            found: format!("{:?}", other),
        }),
    }
}
