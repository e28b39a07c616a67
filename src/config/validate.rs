// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, ServerConfig};
use crate::errors::{Result, WatchRemotelyError};
use crate::watch::IgnoreSet;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::WatchRemotelyError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.server, raw.settings, raw.watch))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    if let Some(host) = &cfg.server.host {
        validate_host(host)?;
    }
    if let Some(path) = &cfg.server.path {
        validate_ws_path(path)?;
    }
    if let Some(ms) = cfg.watch.poll_interval_ms {
        validate_poll_interval(ms)?;
    }
    if let Some(ignored) = &cfg.watch.ignored {
        validate_ignored(ignored)?;
    }
    if let Some(paths) = &cfg.watch.paths {
        if paths.iter().any(|p| p.trim().is_empty()) {
            return Err(WatchRemotelyError::ConfigError(
                "[watch].paths must not contain empty entries".to_string(),
            ));
        }
    }
    Ok(())
}

/// Check the merged configuration (file plus command line).
pub fn validate_server_config(cfg: &ServerConfig) -> Result<()> {
    validate_host(&cfg.host)?;
    validate_ws_path(&cfg.ws_path)?;
    let poll_ms = u64::try_from(cfg.watcher.poll_interval.as_millis()).unwrap_or(u64::MAX);
    validate_poll_interval(poll_ms)?;
    validate_ignored(&cfg.watcher.ignored)?;
    if cfg.paths.is_empty() {
        return Err(WatchRemotelyError::ConfigError(
            "at least one path must be watched".to_string(),
        ));
    }
    Ok(())
}

fn validate_host(host: &str) -> Result<()> {
    if host.trim().is_empty() {
        return Err(WatchRemotelyError::ConfigError(
            "[server].host must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_ws_path(path: &str) -> Result<()> {
    if !path.starts_with('/') {
        return Err(WatchRemotelyError::ConfigError(format!(
            "[server].path must start with '/' (got {path:?})"
        )));
    }
    Ok(())
}

fn validate_poll_interval(ms: u64) -> Result<()> {
    if ms == 0 {
        return Err(WatchRemotelyError::ConfigError(
            "[watch].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_ignored(patterns: &[String]) -> Result<()> {
    IgnoreSet::new(patterns)
        .map(|_| ())
        .map_err(|err| WatchRemotelyError::ConfigError(format!("{err:#}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn parse(raw: &str) -> Result<ConfigFile> {
        let raw: RawConfigFile = toml::from_str(raw)?;
        ConfigFile::try_from(raw)
    }

    #[test]
    fn empty_file_is_valid() {
        assert!(parse("").is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        let cases = [
            "[server]\nhost = \"  \"",
            "[server]\npath = \"hmr\"",
            "[watch]\npoll_interval_ms = 0",
            "[watch]\nignored = [\"src/[\"]",
            "[watch]\npaths = [\"\"]",
        ];
        for case in cases {
            let err = parse(case).unwrap_err();
            assert!(
                matches!(err, WatchRemotelyError::ConfigError(_)),
                "{case}: {err}"
            );
        }
    }

    #[test]
    fn wrong_types_are_toml_errors() {
        let err = parse("[server]\nport = \"many\"").unwrap_err();
        assert!(matches!(err, WatchRemotelyError::TomlError(_)));
    }

    #[test]
    fn merged_config_is_checked_again() {
        let mut cfg = ServerConfig::defaults_for(Path::new("/work"));
        assert!(validate_server_config(&cfg).is_ok());

        cfg.paths.clear();
        assert!(validate_server_config(&cfg).is_err());
    }
}
