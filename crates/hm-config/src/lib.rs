//! Configuration loading for the HiveMind bridge
//!
//! Entries are plain YAML. Credentials can stay out of the entry file with
//! `!secret key` (secrets.yaml) or `!env_var VAR`.
//!
//! # Example
//!
//! ```ignore
//! use hm_config::load_entries;
//!
//! let entries = load_entries("/config", "hivemind.yaml")?;
//! ```

mod entry;
mod error;
mod loader;
mod secrets;

pub use entry::{load_entries, HiveMindConfig, DEFAULT_PORT, USER_AGENT};
pub use error::{ConfigError, ConfigResult};
pub use loader::EntryLoader;
pub use secrets::{Secrets, SECRETS_FILE};
