// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchRemotelyError {
    /// `run()` was called on a server that is already running.
    #[error("hot module replacement server is already running")]
    AlreadyRunning,

    /// `stop()` was called on a server that is not running.
    #[error("hot module replacement server is not running")]
    NotRunning,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Path error: {0}")]
    PathError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WatchRemotelyError {
    /// True for errors caused by calling `run()`/`stop()` in the wrong state.
    pub fn is_usage_error(&self) -> bool {
        matches!(self, Self::AlreadyRunning | Self::NotRunning)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, WatchRemotelyError>;
