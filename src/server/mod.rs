// src/server/mod.rs

//! Start/stop lifecycle binding the engine to its collaborators.
//!
//! [`HmrServer`] owns a [`Watcher`] and a [`ConnectionServer`]. `run()`
//! subscribes one listener to each, registers the watched paths and spawns
//! the content loader and dispatch loop; `stop()` undoes exactly that.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::engine::{ContentsDemand, Dispatcher, EngineEvent, Runtime, run_content_loader};
use crate::errors::{Result, WatchRemotelyError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::listeners::ListenerHandle;
use crate::protocol::EffectiveSettings;
use crate::transport::ConnectionServer;
use crate::watch::Watcher;

/// Everything `run()` set up and `stop()` has to tear down.
struct Running {
    watch_listener: ListenerHandle,
    connection_listener: ListenerHandle,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    dispatch_task: JoinHandle<()>,
}

/// Hot module replacement server: broadcasts watcher events to every
/// connected client, tailored to each client's settings.
pub struct HmrServer<W: Watcher, S: ConnectionServer> {
    watcher: W,
    server: S,
    fs: Arc<dyn FileSystem>,
    paths: Vec<PathBuf>,
    defaults: EffectiveSettings,
    running: Option<Running>,
    stopping: Option<JoinHandle<()>>,
}

impl<W: Watcher, S: ConnectionServer> fmt::Debug for HmrServer<W, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmrServer")
            .field("paths", &self.paths)
            .field("defaults", &self.defaults)
            .field("running", &self.running.is_some())
            .finish_non_exhaustive()
    }
}

impl<W: Watcher, S: ConnectionServer> HmrServer<W, S> {
    pub fn new(
        watcher: W,
        server: S,
        paths: Vec<PathBuf>,
        defaults: EffectiveSettings,
    ) -> Self {
        Self {
            watcher,
            server,
            fs: Arc::new(RealFileSystem),
            paths,
            defaults,
            running: None,
            stopping: None,
        }
    }

    pub fn from_config(config: &ServerConfig, watcher: W, server: S) -> Self {
        Self::new(
            watcher,
            server,
            config.paths.clone(),
            config.defaults.clone(),
        )
    }

    /// Read file contents through `fs` instead of the real filesystem.
    pub fn with_file_system(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn defaults(&self) -> &EffectiveSettings {
        &self.defaults
    }

    /// Replace the process-wide defaults. While running, later events and
    /// acknowledgements use the new values.
    pub fn set_defaults(&mut self, defaults: EffectiveSettings) {
        self.defaults = defaults.clone();
        if let Some(running) = &self.running {
            if running
                .events_tx
                .send(EngineEvent::DefaultsChanged(defaults))
                .is_err()
            {
                warn!("dispatch loop is gone; defaults not forwarded");
            }
        }
    }

    pub fn watcher(&self) -> &W {
        &self.watcher
    }

    pub fn connection_server(&self) -> &S {
        &self.server
    }

    /// Start broadcasting. Must be called from within a Tokio runtime.
    pub fn run(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(WatchRemotelyError::AlreadyRunning);
        }

        let (connections_tx, connections_rx) = mpsc::unbounded_channel();
        let (watch_tx, watch_rx) = mpsc::unbounded_channel();

        let connection_listener = self.server.subscribe(connections_tx);
        let watch_listener = self.watcher.subscribe(watch_tx);

        if let Err(err) = self.watcher.add(&self.paths) {
            warn!(error = %err, "failed to watch paths; rolling back");
            self.server.unsubscribe(connection_listener);
            self.watcher.unsubscribe(watch_listener);
            if let Err(unwatch_err) = self.watcher.unwatch(&self.paths) {
                debug!(error = %unwatch_err, "unwatch during rollback failed");
            }
            return Err(err);
        }

        let demand = ContentsDemand::new();
        let dispatcher = Dispatcher::new(self.defaults.clone(), demand.clone());
        let (runtime, events_tx) = Runtime::new(dispatcher, Arc::clone(&self.fs), connections_rx);

        tokio::spawn(run_content_loader(
            watch_rx,
            Arc::clone(&self.fs),
            demand,
            events_tx.clone(),
        ));
        let dispatch_task = tokio::spawn(runtime.run());

        info!(paths = ?self.paths, "hot module replacement server running");

        self.running = Some(Running {
            watch_listener,
            connection_listener,
            events_tx,
            dispatch_task,
        });
        Ok(())
    }

    /// Stop broadcasting and disconnect every client.
    ///
    /// Content reads already in progress are not cancelled; their results
    /// are dropped.
    pub fn stop(&mut self) -> Result<()> {
        let Some(running) = self.running.take() else {
            return Err(WatchRemotelyError::NotRunning);
        };

        self.server.unsubscribe(running.connection_listener);
        self.watcher.unsubscribe(running.watch_listener);

        if let Err(err) = self.watcher.unwatch(&self.paths) {
            warn!(error = %err, "failed to unwatch paths");
        }

        if running.events_tx.send(EngineEvent::Shutdown).is_err() {
            debug!("dispatch loop already stopped");
        }
        self.stopping = Some(running.dispatch_task);

        info!("hot module replacement server stopped");
        Ok(())
    }

    /// Wait until the dispatch loop shut down by the last `stop()` has
    /// exited, i.e. every client connection has been dropped.
    pub async fn stopped(&mut self) {
        if let Some(task) = self.stopping.take() {
            if let Err(err) = task.await {
                warn!(error = %err, "dispatch loop panicked");
            }
        }
    }
}

impl<W: Watcher, S: ConnectionServer> Drop for HmrServer<W, S> {
    fn drop(&mut self) {
        if self.running.is_some() {
            let _ = self.stop();
        }
    }
}
