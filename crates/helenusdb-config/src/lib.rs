//! TOML configuration for HelenusDB repositories.
//!
//! The config crate is standalone: it knows nothing about key definitions or
//! sessions. Core applies a validated [`Config`] to its tables and unit-of-work
//! settings.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::Path};
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {message}")]
    Read { path: String, message: String },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

///
/// UnitOfWorkMode
///
/// Batch type used when a unit of work submits its statements.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitOfWorkMode {
    #[default]
    Logged,
    Unlogged,
}

///
/// TableConfig
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableConfig {
    /// Default row time-to-live in seconds; 0 keeps rows forever.
    pub ttl: u64,
}

///
/// Config
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Keyspace override; tables keep their declared keyspace when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyspace: Option<String>,
    pub unit_of_work: UnitOfWorkMode,
    pub tables: BTreeMap<String, TableConfig>,
}

impl Config {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    /// Load, parse and validate a config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.display().to_string(),
            message: err.to_string(),
        })?;

        Self::from_toml_str(&content)
    }

    /// Validate names that end up embedded in generated statements.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(keyspace) = &self.keyspace
            && !is_identifier(keyspace)
        {
            return Err(ConfigError::Invalid(format!(
                "keyspace '{keyspace}' is not a valid identifier"
            )));
        }

        for name in self.tables.keys() {
            if !is_identifier(name) {
                return Err(ConfigError::Invalid(format!(
                    "table name '{name}' is not a valid identifier"
                )));
            }
        }

        Ok(())
    }

    /// Settings for one table, falling back to defaults when absent.
    #[must_use]
    pub fn table(&self, name: &str) -> TableConfig {
        self.tables.get(name).cloned().unwrap_or_default()
    }
}

// Unquoted CQL identifiers: a letter followed by letters, digits or underscores.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();

    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

///
/// TESTS
///
