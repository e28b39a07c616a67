// src/transport/mod.rs

//! Duplex client connections.
//!
//! The core never touches sockets. It sees:
//! - a [`ConnectionServer`] it can subscribe to for newly accepted
//!   connections, and
//! - per connection, a [`Connection`] handle for outbound text frames plus a
//!   receiver of inbound text frames that ends when the peer goes away.
//!
//! [`ws::WsServer`] is the production implementation on top of `axum`.

pub mod ws;

use std::net::SocketAddr;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::listeners::ListenerHandle;

pub use ws::WsServer;

/// Listener for accepted connections.
pub type ConnectionListener = mpsc::UnboundedSender<IncomingConnection>;

/// The outbound side of a connection has been torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("connection closed")]
pub struct ConnectionClosed;

/// Cheap, cloneable handle used to send text frames to one client.
#[derive(Debug, Clone)]
pub struct Connection {
    tx: mpsc::UnboundedSender<String>,
}

impl Connection {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// A connection whose outbound frames land in the returned receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Queue a text frame. Fails once the transport side has gone away.
    pub fn send(&self, payload: String) -> Result<(), ConnectionClosed> {
        self.tx.send(payload).map_err(|_| ConnectionClosed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A freshly accepted connection, as handed to connection listeners.
#[derive(Debug)]
pub struct IncomingConnection {
    pub connection: Connection,
    /// Inbound text frames. Ends when the client disconnects.
    pub inbound: mpsc::UnboundedReceiver<String>,
    pub peer: Option<SocketAddr>,
}

/// Source of accepted client connections.
pub trait ConnectionServer: Send {
    /// Install a listener for accepted connections.
    fn subscribe(&mut self, listener: ConnectionListener) -> ListenerHandle;

    /// Remove a listener previously returned by [`ConnectionServer::subscribe`].
    fn unsubscribe(&mut self, handle: ListenerHandle) -> bool;

    /// Number of installed listeners.
    fn listener_count(&self) -> usize;
}
