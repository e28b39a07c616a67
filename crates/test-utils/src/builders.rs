#![allow(dead_code)]

use std::path::PathBuf;

use watch_remotely::config::ServerConfig;
use watch_remotely::config::model::{RawConfigFile, SettingsSection, WatchSection};
use watch_remotely::protocol::EffectiveSettings;

/// Builder for `ServerConfig` to simplify test setup.
pub struct ServerConfigBuilder {
    config: ServerConfig,
}

impl ServerConfigBuilder {
    /// Defaults as if started from `cwd`.
    pub fn new(cwd: &str) -> Self {
        Self {
            config: ServerConfig::defaults_for(cwd.as_ref()),
        }
    }

    pub fn with_paths(mut self, paths: &[&str]) -> Self {
        self.config.paths = paths.iter().map(PathBuf::from).collect();
        self
    }

    pub fn with_defaults(mut self, defaults: EffectiveSettings) -> Self {
        self.config.defaults = defaults;
        self
    }

    pub fn relative_paths(mut self, val: bool) -> Self {
        self.config.defaults.relative_paths = val;
        self
    }

    pub fn with_contents(mut self, val: bool) -> Self {
        self.config.defaults.with_contents = val;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn build(self) -> ServerConfig {
        self.config
    }
}

/// Builder for `RawConfigFile`, i.e. what a TOML file would contain.
#[derive(Default)]
pub struct RawConfigBuilder {
    raw: RawConfigFile,
}

impl RawConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn host(mut self, host: &str) -> Self {
        self.raw.server.host = Some(host.to_string());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.raw.server.port = Some(port);
        self
    }

    pub fn ws_path(mut self, path: &str) -> Self {
        self.raw.server.path = Some(path.to_string());
        self
    }

    pub fn settings(mut self, settings: SettingsSection) -> Self {
        self.raw.settings = settings;
        self
    }

    pub fn watch(mut self, watch: WatchSection) -> Self {
        self.raw.watch = watch;
        self
    }

    pub fn build(self) -> RawConfigFile {
        self.raw
    }
}
