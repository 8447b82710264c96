//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading or validating connector configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid environment override: {0}")]
    Env(#[from] envy::Error),

    #[error("invalid base URL {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
