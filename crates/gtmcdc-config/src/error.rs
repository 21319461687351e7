use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("failed to parse env file: {0}")]
    EnvFile(#[from] dotenvy::Error),

    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("kafka topic must be set when brokers are enabled")]
    MissingTopic,

    #[error("invalid prometheus listen address {0:?}: expected host:port or \"off\"")]
    InvalidListenAddr(String),

    #[error("kafka timeout must be a positive number of milliseconds")]
    InvalidTimeout,
}

pub type ConfigResult<T> = Result<T, ConfigError>;
