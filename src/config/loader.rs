// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, ConfigOverrides, RawConfigFile, ServerConfig};
use crate::errors::Result;

/// File name looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "watch-remotely.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run basic validation.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// `watch-remotely.toml` in `cwd`.
pub fn default_config_path(cwd: &Path) -> PathBuf {
    cwd.join(DEFAULT_CONFIG_FILE)
}

/// Build the process configuration from all layers.
///
/// - An explicit `config_path` must exist.
/// - Otherwise [`default_config_path`] is used when present.
/// - Without any file, built-in defaults plus `overrides` apply.
pub fn load_server_config(
    config_path: Option<&Path>,
    overrides: &ConfigOverrides,
    cwd: &Path,
) -> Result<ServerConfig> {
    let file = match config_path {
        Some(path) => load_and_validate(path)?,
        None => {
            let path = default_config_path(cwd);
            if path.is_file() {
                debug!(?path, "using config file from working directory");
                load_and_validate(&path)?
            } else {
                ConfigFile::default()
            }
        }
    };

    ServerConfig::resolve(&file, overrides, cwd)
}
