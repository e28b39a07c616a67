// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::config::validate::validate_server_config;
use crate::errors::Result;
use crate::protocol::EffectiveSettings;
use crate::watch::WatcherOptions;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5776;
pub const DEFAULT_WS_PATH: &str = "/hmr";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
/// Ignored below the working directory unless the config says otherwise.
pub const DEFAULT_IGNORED_DIR: &str = "jspm_packages";

/// Raw configuration as read from a TOML file (before validation).
///
/// ```toml
/// [server]
/// host = "localhost"
/// port = 5776
/// path = "/hmr"
///
/// [settings]
/// base_path = "/project"
/// relative_paths = true
/// with_contents = false
///
/// [watch]
/// paths = ["src"]
/// ignored = ["**/node_modules/**"]
/// ignore_initial = true
/// use_polling = false
/// poll_interval_ms = 100
/// ```
///
/// Every section and key is optional; unset keys fall back to the built-in
/// defaults or to the command line.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub settings: SettingsSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// Validated configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfigFile {
    server: ServerSection,
    settings: SettingsSection,
    watch: WatchSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        server: ServerSection,
        settings: SettingsSection,
        watch: WatchSection,
    ) -> Self {
        Self {
            server,
            settings,
            watch,
        }
    }

    pub fn server(&self) -> &ServerSection {
        &self.server
    }

    pub fn settings(&self) -> &SettingsSection {
        &self.settings
    }

    pub fn watch(&self) -> &WatchSection {
        &self.watch
    }
}

/// `[server]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
    /// HTTP path on which WebSocket upgrades are accepted.
    pub path: Option<String>,
}

/// `[settings]` section: process-wide default client settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SettingsSection {
    pub base_path: Option<String>,
    pub relative_paths: Option<bool>,
    pub with_contents: Option<bool>,
}

/// `[watch]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchSection {
    /// Files or directories to watch. Relative entries are resolved against
    /// the working directory.
    pub paths: Option<Vec<String>>,

    /// Replaces the default ignore list when present.
    pub ignored: Option<Vec<String>>,

    pub ignore_initial: Option<bool>,
    pub use_polling: Option<bool>,
    pub poll_interval_ms: Option<u64>,
}

/// Values given on the command line. They win over the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub base_path: Option<String>,
    pub relative_paths: Option<bool>,
    pub with_contents: Option<bool>,
    /// Appended to the ignore list.
    pub ignored: Vec<String>,
    /// Replaces the watched paths when non-empty.
    pub paths: Vec<String>,
    pub use_polling: Option<bool>,
}

/// Fully-resolved process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub ws_path: String,
    pub defaults: EffectiveSettings,
    pub paths: Vec<PathBuf>,
    pub watcher: WatcherOptions,
}

impl ServerConfig {
    /// Built-in defaults relative to `cwd`.
    pub fn defaults_for(cwd: &Path) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            ws_path: DEFAULT_WS_PATH.to_string(),
            defaults: EffectiveSettings::new(cwd.to_string_lossy()),
            paths: vec![cwd.to_path_buf()],
            watcher: WatcherOptions {
                ignored: vec![cwd.join(DEFAULT_IGNORED_DIR).to_string_lossy().into_owned()],
                ..WatcherOptions::default()
            },
        }
    }

    /// Merge defaults, the config file and command-line overrides (in that
    /// order of precedence, lowest first).
    pub fn merged(file: &ConfigFile, overrides: &ConfigOverrides, cwd: &Path) -> Self {
        let mut cfg = Self::defaults_for(cwd);

        let server = file.server();
        if let Some(host) = overrides.host.clone().or_else(|| server.host.clone()) {
            cfg.host = host;
        }
        if let Some(port) = overrides.port.or(server.port) {
            cfg.port = port;
        }
        if let Some(path) = &server.path {
            cfg.ws_path = path.clone();
        }

        let settings = file.settings();
        if let Some(base) = overrides
            .base_path
            .as_deref()
            .or(settings.base_path.as_deref())
        {
            cfg.defaults.base_path = resolve_against(cwd, base).to_string_lossy().into_owned();
        }
        if let Some(relative) = overrides.relative_paths.or(settings.relative_paths) {
            cfg.defaults.relative_paths = relative;
        }
        if let Some(contents) = overrides.with_contents.or(settings.with_contents) {
            cfg.defaults.with_contents = contents;
        }

        let watch = file.watch();
        let paths: Option<&[String]> = if overrides.paths.is_empty() {
            watch.paths.as_deref()
        } else {
            Some(&overrides.paths)
        };
        if let Some(paths) = paths {
            cfg.paths = paths.iter().map(|p| resolve_against(cwd, p)).collect();
        }

        if let Some(ignored) = &watch.ignored {
            cfg.watcher.ignored = ignored.iter().map(|p| resolve_ignore_entry(cwd, p)).collect();
        }
        cfg.watcher
            .ignored
            .extend(overrides.ignored.iter().map(|p| resolve_ignore_entry(cwd, p)));

        if let Some(ignore_initial) = watch.ignore_initial {
            cfg.watcher.ignore_initial = ignore_initial;
        }
        if let Some(polling) = overrides.use_polling.or(watch.use_polling) {
            cfg.watcher.use_polling = polling;
        }
        if let Some(ms) = watch.poll_interval_ms {
            cfg.watcher.poll_interval = Duration::from_millis(ms);
        }

        cfg
    }

    /// [`ServerConfig::merged`] followed by validation of the result.
    pub fn resolve(file: &ConfigFile, overrides: &ConfigOverrides, cwd: &Path) -> Result<Self> {
        let cfg = Self::merged(file, overrides, cwd);
        validate_server_config(&cfg)?;
        Ok(cfg)
    }

    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn resolve_against(cwd: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Plain relative paths in the ignore list are anchored at `cwd`; globs are
/// kept as written.
fn resolve_ignore_entry(cwd: &Path, entry: &str) -> String {
    let is_glob = entry.contains(['*', '?', '[', '{']);
    if is_glob || Path::new(entry).is_absolute() {
        entry.to_string()
    } else {
        cwd.join(entry).to_string_lossy().into_owned()
    }
}
