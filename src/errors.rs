// src/errors.rs

//! Crate-wide error type and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    /// A build-context operation was invoked while its action was not live.
    #[error("action is not running")]
    ActionNotRunning,

    #[error("called failed() after passed()")]
    FailedAfterPassed,

    #[error("called failed() after success")]
    FailedAfterDone,

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DriverError>;
