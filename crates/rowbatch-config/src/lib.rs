//! Batching configuration for rowbatch.
//!
//! Settings are read from TOML. Every field has a default, so an empty
//! document is a valid configuration.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};
use thiserror::Error as ThisError;

///
/// CONSTANTS
///

/// Default cap on statements rendered into one round trip.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 42;

/// Default cap on bound parameters per round trip.
///
/// Matches the smallest limit among common relational stores (2100),
/// minus headroom for store-side parameters.
pub const DEFAULT_MAX_PARAMETERS: usize = 2098;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {field} {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

///
/// BatchConfig
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    #[serde(default)]
    pub batch: BatchSettings,

    #[serde(default)]
    pub command: CommandSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl BatchConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        Self::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let batch = &self.batch;

        if batch.max_batch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "batch.max_batch_size",
                message: "must be at least 1".to_string(),
            });
        }
        if batch.max_parameters == 0 {
            return Err(ConfigError::Invalid {
                field: "batch.max_parameters",
                message: "must be at least 1".to_string(),
            });
        }
        if batch.min_batch_size > batch.max_batch_size {
            return Err(ConfigError::Invalid {
                field: "batch.min_batch_size",
                message: format!(
                    "({}) must not exceed batch.max_batch_size ({})",
                    batch.min_batch_size, batch.max_batch_size
                ),
            });
        }

        Ok(())
    }

    /// Command timeout, if one is configured.
    #[must_use]
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command.timeout_secs.map(Duration::from_secs)
    }
}

///
/// BatchSettings
///
/// max_batch_size : statements per round trip
/// max_parameters : bound parameters per round trip
/// min_batch_size : below this many commands, each command runs alone
///

#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchSettings {
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,

    #[serde(default = "default_max_parameters")]
    pub max_parameters: usize,

    #[serde(default = "default_min_batch_size")]
    pub min_batch_size: usize,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            max_parameters: default_max_parameters(),
            min_batch_size: default_min_batch_size(),
        }
    }
}

///
/// CommandSettings
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CommandSettings {
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

///
/// LoggingSettings
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Include parameter values in command logs.
    #[serde(default)]
    pub sensitive_data_logging: bool,
}

const fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

const fn default_max_parameters() -> usize {
    DEFAULT_MAX_PARAMETERS
}

const fn default_min_batch_size() -> usize {
    1
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = BatchConfig::from_toml_str("").expect("empty config should parse");

        assert_eq!(config, BatchConfig::default());
        assert_eq!(config.batch.max_batch_size, DEFAULT_MAX_BATCH_SIZE);
        assert_eq!(config.batch.max_parameters, DEFAULT_MAX_PARAMETERS);
        assert_eq!(config.batch.min_batch_size, 1);
        assert!(!config.logging.sensitive_data_logging);
        assert_eq!(config.command_timeout(), None);
    }

    #[test]
    fn sections_override_defaults() {
        let config = BatchConfig::from_toml_str(
            r"
            [batch]
            max_batch_size = 10
            max_parameters = 100

            [command]
            timeout_secs = 30

            [logging]
            sensitive_data_logging = true
            ",
        )
        .expect("config should parse");

        assert_eq!(config.batch.max_batch_size, 10);
        assert_eq!(config.batch.max_parameters, 100);
        assert_eq!(config.command_timeout(), Some(Duration::from_secs(30)));
        assert!(config.logging.sensitive_data_logging);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = BatchConfig::from_toml_str("[batch]\nmax_batch_size = 0\n")
            .expect_err("zero batch size should be rejected");

        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "batch.max_batch_size",
                ..
            }
        ));
    }

    #[test]
    fn min_above_max_is_rejected() {
        let err = BatchConfig::from_toml_str("[batch]\nmax_batch_size = 2\nmin_batch_size = 3\n")
            .expect_err("min above max should be rejected");

        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "batch.min_batch_size",
                ..
            }
        ));
    }

    #[test]
    fn unknown_keys_fail_to_parse() {
        let err = BatchConfig::from_toml_str("[batch]\nmax_batch = 2\n")
            .expect_err("unknown key should be rejected");

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = BatchConfig::from_path("/nonexistent/rowbatch.toml")
            .expect_err("missing file should fail");

        match err {
            ConfigError::Read { path, .. } => assert_eq!(path, "/nonexistent/rowbatch.toml"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
