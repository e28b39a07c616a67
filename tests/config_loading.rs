// tests/config_loading.rs

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use watch_remotely::config::model::{SettingsSection, WatchSection};
use watch_remotely::config::{
    load_and_validate, load_server_config, ConfigFile, ConfigOverrides, ServerConfig,
};
use watch_remotely::errors::WatchRemotelyError;
use watch_remotely_test_utils::builders::RawConfigBuilder;

#[test]
fn explicit_config_file_is_loaded_and_merged() {
    let dir = tempfile::tempdir().unwrap();
    let cwd = dir.path();
    let path = cwd.join("custom.toml");
    fs::write(
        &path,
        r#"
        [server]
        port = 6001

        [settings]
        relative_paths = true

        [watch]
        paths = ["src"]
        use_polling = true
        poll_interval_ms = 50
        "#,
    )
    .unwrap();

    let overrides = ConfigOverrides {
        host: Some("127.0.0.1".into()),
        ..ConfigOverrides::default()
    };
    let cfg = load_server_config(Some(path.as_path()), &overrides, cwd).unwrap();

    assert_eq!(cfg.bind_addr(), "127.0.0.1:6001");
    assert_eq!(cfg.ws_path, "/hmr");
    assert!(cfg.defaults.relative_paths);
    assert_eq!(cfg.defaults.base_path, cwd.to_string_lossy());
    assert_eq!(cfg.paths, vec![cwd.join("src")]);
    assert!(cfg.watcher.use_polling);
    assert_eq!(cfg.watcher.poll_interval, Duration::from_millis(50));
}

#[test]
fn default_config_file_is_found_in_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("watch-remotely.toml"),
        "[server]\npath = \"/live\"\n",
    )
    .unwrap();

    let cfg = load_server_config(None, &ConfigOverrides::default(), dir.path()).unwrap();
    assert_eq!(cfg.ws_path, "/live");
}

#[test]
fn no_config_file_means_builtin_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let cfg = load_server_config(None, &ConfigOverrides::default(), dir.path()).unwrap();
    assert_eq!(cfg, ServerConfig::defaults_for(dir.path()));
}

#[test]
fn missing_explicit_config_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");

    let err = load_server_config(Some(missing.as_path()), &ConfigOverrides::default(), dir.path())
        .unwrap_err();
    assert!(matches!(err, WatchRemotelyError::IoError(_)));
}

#[test]
fn broken_toml_is_a_toml_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "[server\nport = 1").unwrap();

    assert!(matches!(
        load_and_validate(&path).unwrap_err(),
        WatchRemotelyError::TomlError(_)
    ));
}

#[test]
fn invalid_cli_ignore_pattern_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let overrides = ConfigOverrides {
        ignored: vec!["src/**/[".into()],
        ..ConfigOverrides::default()
    };

    let err = load_server_config(None, &overrides, dir.path()).unwrap_err();
    assert!(matches!(err, WatchRemotelyError::ConfigError(_)));
}

#[test]
fn builder_configs_validate_like_files() {
    let raw = RawConfigBuilder::new()
        .host("0.0.0.0")
        .port(7000)
        .ws_path("/events")
        .settings(SettingsSection {
            base_path: Some("/srv/app".into()),
            with_contents: Some(true),
            ..SettingsSection::default()
        })
        .watch(WatchSection {
            ignored: Some(vec!["**/*.tmp".into()]),
            ..WatchSection::default()
        })
        .build();
    let file = ConfigFile::try_from(raw).unwrap();

    let cfg = ServerConfig::resolve(&file, &ConfigOverrides::default(), "/work".as_ref()).unwrap();
    assert_eq!(cfg.bind_addr(), "0.0.0.0:7000");
    assert_eq!(cfg.ws_path, "/events");
    assert_eq!(cfg.defaults.base_path, "/srv/app");
    assert!(cfg.defaults.with_contents);
    assert_eq!(cfg.watcher.ignored, vec!["**/*.tmp".to_string()]);
    assert_eq!(cfg.paths, vec![PathBuf::from("/work")]);

    let bad = RawConfigBuilder::new().ws_path("events").build();
    assert!(ConfigFile::try_from(bad).is_err());
}
