use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use watch_remotely::errors::{Result, WatchRemotelyError};
use watch_remotely::listeners::{ListenerHandle, Listeners};
use watch_remotely::transport::{
    Connection, ConnectionListener, ConnectionServer, IncomingConnection,
};
use watch_remotely::types::{WatchEvent, WatchEventKind};
use watch_remotely::watch::{WatchListener, Watcher};

use crate::DEADLINE as RECV_TIMEOUT;

#[derive(Default)]
struct WatcherState {
    listeners: Listeners<WatchEvent>,
    watched: BTreeSet<PathBuf>,
    add_calls: Vec<Vec<PathBuf>>,
    unwatch_calls: Vec<Vec<PathBuf>>,
    fail_next_add: bool,
}

/// A fake watcher that:
/// - records `add` / `unwatch` calls
/// - lets the test emit events to whoever is subscribed.
///
/// Clones share state, so a test can keep one handle and give another to
/// the server under test.
#[derive(Clone, Default)]
pub struct FakeWatcher {
    state: Arc<Mutex<WatcherState>>,
}

impl FakeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, WatcherState> {
        self.state.lock().unwrap()
    }

    /// Deliver an event to every listener. Returns how many received it.
    pub fn emit(&self, kind: WatchEventKind, path: impl Into<PathBuf>) -> usize {
        self.lock().listeners.emit(&WatchEvent::new(kind, path))
    }

    /// Make the next `add` call fail.
    pub fn fail_next_add(&self) {
        self.lock().fail_next_add = true;
    }

    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.lock().watched.iter().cloned().collect()
    }

    pub fn is_watching(&self, path: impl AsRef<Path>) -> bool {
        self.lock().watched.contains(path.as_ref())
    }

    pub fn add_calls(&self) -> Vec<Vec<PathBuf>> {
        self.lock().add_calls.clone()
    }

    pub fn unwatch_calls(&self) -> Vec<Vec<PathBuf>> {
        self.lock().unwatch_calls.clone()
    }

    pub fn subscribers(&self) -> usize {
        self.lock().listeners.len()
    }
}

impl Watcher for FakeWatcher {
    fn subscribe(&mut self, listener: WatchListener) -> ListenerHandle {
        self.lock().listeners.subscribe(listener)
    }

    fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        self.lock().listeners.unsubscribe(handle)
    }

    fn add(&mut self, paths: &[PathBuf]) -> Result<()> {
        let mut state = self.lock();
        state.add_calls.push(paths.to_vec());
        if std::mem::take(&mut state.fail_next_add) {
            return Err(WatchRemotelyError::ConfigError(
                "fake watcher refused to add paths".to_string(),
            ));
        }
        state.watched.extend(paths.iter().cloned());
        Ok(())
    }

    fn unwatch(&mut self, paths: &[PathBuf]) -> Result<()> {
        let mut state = self.lock();
        state.unwatch_calls.push(paths.to_vec());
        for path in paths {
            state.watched.remove(path);
        }
        Ok(())
    }

    fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

/// A fake connection server whose "sockets" are in-memory channels.
#[derive(Clone, Default)]
pub struct FakeConnectionServer {
    listeners: Arc<Mutex<Listeners<IncomingConnection>>>,
}

impl FakeConnectionServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new client connection. Returns `None` (a rejected connection)
    /// when nobody is subscribed.
    pub fn connect(&self) -> Option<FakeClient> {
        let (connection, outbound) = Connection::channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();
        let incoming = IncomingConnection {
            connection,
            inbound,
            peer: None,
        };

        match self.listeners.lock().unwrap().offer(incoming) {
            None => Some(FakeClient {
                outbound,
                inbound: Some(inbound_tx),
            }),
            Some(_rejected) => None,
        }
    }

    pub fn subscribers(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }
}

impl ConnectionServer for FakeConnectionServer {
    fn subscribe(&mut self, listener: ConnectionListener) -> ListenerHandle {
        self.listeners.lock().unwrap().subscribe(listener)
    }

    fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        self.listeners.lock().unwrap().unsubscribe(handle)
    }

    fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }
}

/// The client end of a [`FakeConnectionServer`] connection.
pub struct FakeClient {
    outbound: mpsc::UnboundedReceiver<String>,
    inbound: Option<mpsc::UnboundedSender<String>>,
}

impl FakeClient {
    /// Send a text frame to the server.
    pub fn send(&self, text: impl Into<String>) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(text.into());
        }
    }

    /// Send `{"event":"settings","settings":<settings>}`.
    pub fn send_settings(&self, settings: serde_json::Value) {
        let message = serde_json::json!({ "event": "settings", "settings": settings });
        self.send(message.to_string());
    }

    /// Next frame from the server, or `None` if the server closed the
    /// connection (or nothing arrived within five seconds).
    pub async fn recv(&mut self) -> Option<String> {
        tokio::time::timeout(RECV_TIMEOUT, self.outbound.recv())
            .await
            .ok()
            .flatten()
    }

    pub async fn recv_json(&mut self) -> serde_json::Value {
        let text = self.recv().await.expect("expected a frame from the server");
        serde_json::from_str(&text).expect("server sent invalid JSON")
    }

    /// A frame that is already queued, without waiting.
    pub fn try_recv(&mut self) -> Option<String> {
        self.outbound.try_recv().ok()
    }

    /// True once the server side has dropped the connection.
    pub async fn is_disconnected(&mut self) -> bool {
        matches!(
            tokio::time::timeout(RECV_TIMEOUT, self.outbound.recv()).await,
            Ok(None)
        )
    }

    /// Close the client side. The server sees the inbound stream end.
    pub fn close(&mut self) {
        self.inbound = None;
    }
}
