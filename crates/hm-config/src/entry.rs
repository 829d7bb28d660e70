//! HiveMind config entry
//!
//! One entry describes one remote device: where to reach it, the credentials
//! to present, and how its entities are named.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::loader::EntryLoader;

/// Default HiveMind listener port
pub const DEFAULT_PORT: u16 = 5678;

/// User agent presented to the HiveMind node
pub const USER_AGENT: &str = "HomeAssistantV0.0.2";

/// Configuration of one bridged device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HiveMindConfig {
    /// Device name, used in entity names and ids
    #[serde(default = "default_name")]
    pub name: String,

    /// HiveMind access key
    pub access_key: String,

    /// HiveMind password
    pub password: String,

    /// Site the device is located at
    #[serde(default = "default_site_id")]
    pub site_id: String,

    /// HiveMind node host
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Accept self-signed TLS certificates
    #[serde(default)]
    pub allow_self_signed: bool,

    /// Drive playback through the legacy audio service instead of OCP
    #[serde(default)]
    pub legacy_audio: bool,

    /// Session messages are tagged with on the assistant's bus
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_name() -> String {
    "unnamed device".to_string()
}

fn default_site_id() -> String {
    "unknown".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_session_id() -> String {
    "default".to_string()
}

impl HiveMindConfig {
    /// Create an entry with defaults for everything but the connection details
    pub fn new(
        host: impl Into<String>,
        access_key: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: default_name(),
            access_key: access_key.into(),
            password: password.into(),
            site_id: default_site_id(),
            host: host.into(),
            port: DEFAULT_PORT,
            allow_self_signed: false,
            legacy_audio: false,
            session_id: default_session_id(),
        }
    }

    /// Set the device name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the site id
    pub fn with_site_id(mut self, site_id: impl Into<String>) -> Self {
        self.site_id = site_id.into();
        self
    }

    /// Enable or disable the legacy audio service
    pub fn with_legacy_audio(mut self, legacy_audio: bool) -> Self {
        self.legacy_audio = legacy_audio;
        self
    }

    /// Parse an entry from a processed YAML value
    pub fn from_value(value: serde_yaml::Value, source: &Path) -> ConfigResult<Self> {
        let entry: Self = serde_yaml::from_value(value).map_err(|e| ConfigError::ParseYaml {
            path: source.to_path_buf(),
            source: e,
        })?;
        entry.validate()?;
        Ok(entry)
    }

    /// Check required fields
    pub fn validate(&self) -> ConfigResult<()> {
        for (key, value) in [
            ("host", &self.host),
            ("access_key", &self.access_key),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                key: "port".to_string(),
                reason: "must be between 1 and 65535".to_string(),
            });
        }
        Ok(())
    }

    /// Device name as used in entity names (spaces replaced by dashes)
    pub fn slug(&self) -> String {
        self.name.replace(' ', "-")
    }

    /// `host:port` of the HiveMind node
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Load every entry in a bridge configuration file
///
/// The file holds a single entry mapping, or a `hivemind:` key with either a
/// list of entries or one entry.
pub fn load_entries(
    config_dir: impl Into<PathBuf>,
    file: impl AsRef<Path>,
) -> ConfigResult<Vec<HiveMindConfig>> {
    let loader = EntryLoader::new(config_dir)?;
    let source = loader.path_of(file.as_ref());
    let value = loader.load(&source)?;

    let entries = match value.get("hivemind").cloned() {
        Some(serde_yaml::Value::Sequence(items)) => items
            .into_iter()
            .map(|item| HiveMindConfig::from_value(item, &source))
            .collect::<ConfigResult<Vec<_>>>()?,
        Some(single @ serde_yaml::Value::Mapping(_)) => {
            vec![HiveMindConfig::from_value(single, &source)?]
        }
        Some(other) => {
            return Err(ConfigError::InvalidValue {
                key: "hivemind".to_string(),
                reason: format!("expected a list or mapping, got {:?}", other),
            })
        }
        None => vec![HiveMindConfig::from_value(value, &source)?],
    };

    for entry in &entries {
        debug!(name = %entry.name, site_id = %entry.site_id, host = %entry.host, "Loaded entry");
    }
    info!("Loaded {} HiveMind entries from {:?}", entries.len(), source);
    Ok(entries)
}
