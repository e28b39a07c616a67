// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::ConfigOverrides;

/// Command-line arguments for `watch-remotely`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watch-remotely",
    version,
    about = "Watch files and broadcast changes to WebSocket clients.",
    long_about = None
)]
pub struct CliArgs {
    /// Files or directories to watch. Default: the working directory.
    #[arg(value_name = "PATHS")]
    pub paths: Vec<String>,

    /// Port to listen on. Default: 5776.
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Host to bind. Default: localhost.
    #[arg(short = 'H', long)]
    pub host: Option<String>,

    /// Default base path for relative event paths.
    #[arg(short = 'b', long, value_name = "PATH")]
    pub base_path: Option<String>,

    /// Send paths relative to the base path by default.
    #[arg(short = 'r', long)]
    pub relative_paths: bool,

    /// Send file contents with `added` / `changed` events by default.
    #[arg(short = 'c', long)]
    pub with_contents: bool,

    /// Path or glob to ignore. May be repeated.
    #[arg(short = 'i', long, value_name = "PATTERN")]
    pub ignored: Vec<String>,

    /// Path to a TOML config file.
    ///
    /// Default: `watch-remotely.toml` in the working directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCH_REMOTELY_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Poll the filesystem instead of using native notifications.
    #[arg(long)]
    pub polling: bool,
}

impl CliArgs {
    /// The subset of flags that override configuration values.
    ///
    /// Boolean flags can only switch a setting on; leaving them out defers to
    /// the config file.
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            base_path: self.base_path.clone(),
            relative_paths: self.relative_paths.then_some(true),
            with_contents: self.with_contents.then_some(true),
            ignored: self.ignored.clone(),
            paths: self.paths.clone(),
            use_polling: self.polling.then_some(true),
        }
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
