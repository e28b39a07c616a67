// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod listeners;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod transport;
pub mod types;
pub mod watch;

use anyhow::Result;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::load_server_config;
use crate::server::HmrServer;
use crate::transport::WsServer;
use crate::watch::NotifyWatcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (defaults, TOML file, CLI flags)
/// - the WebSocket server
/// - the file watcher
/// - the broadcast server lifecycle
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cwd = std::env::current_dir()?;
    let cfg = load_server_config(args.config.as_deref(), &args.overrides(), &cwd)?;

    let ws = WsServer::bind(&cfg.host, cfg.port, &cfg.ws_path).await?;
    info!(addr = %ws.local_addr(), path = %cfg.ws_path, "accepting WebSocket clients");

    let watcher = NotifyWatcher::new(cfg.watcher.clone())?;
    let mut server = HmrServer::from_config(&cfg, watcher, ws);
    server.run()?;

    tokio::signal::ctrl_c().await?;
    info!("Ctrl-C received; shutting down");

    server.stop()?;
    server.stopped().await;
    Ok(())
}
