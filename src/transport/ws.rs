// src/transport/ws.rs

//! WebSocket connection server on top of `axum`.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{ConnectInfo, State};
use axum::response::Response;
use axum::routing::get;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::listeners::{ListenerHandle, Listeners};

use super::{Connection, ConnectionListener, ConnectionServer, IncomingConnection};

type SharedListeners = Arc<Mutex<Listeners<IncomingConnection>>>;

#[derive(Clone)]
struct WsState {
    listeners: SharedListeners,
}

/// Accepts WebSocket upgrades on a single route and hands every accepted
/// socket to the subscribed listener.
///
/// Sockets accepted while nobody is subscribed are closed immediately.
/// Dropping the server stops accepting new connections.
pub struct WsServer {
    listeners: SharedListeners,
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl std::fmt::Debug for WsServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsServer")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl WsServer {
    /// Bind `host:port` and serve WebSocket upgrades on `path`.
    pub async fn bind(host: &str, port: u16, path: &str) -> Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        let local_addr = listener.local_addr()?;

        let listeners: SharedListeners = Arc::new(Mutex::new(Listeners::new()));
        let state = WsState {
            listeners: Arc::clone(&listeners),
        };

        let app = Router::new()
            .route(path, get(ws_handler))
            .with_state(state);

        let task = tokio::spawn(async move {
            let service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(err) = axum::serve(listener, service).await {
                warn!(error = %err, "websocket server stopped");
            }
        });

        info!(%local_addr, path, "websocket server listening");

        Ok(Self {
            listeners,
            local_addr,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for WsServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl ConnectionServer for WsServer {
    fn subscribe(&mut self, listener: ConnectionListener) -> ListenerHandle {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .subscribe(listener)
    }

    fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unsubscribe(handle)
    }

    fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<WsState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state, peer))
}

/// Pump frames between one socket and the channels seen by the core.
async fn handle_socket(mut socket: WebSocket, state: WsState, peer: SocketAddr) {
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();

    let incoming = IncomingConnection {
        connection: Connection::new(out_tx),
        inbound: in_rx,
        peer: Some(peer),
    };

    let rejected = state
        .listeners
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .offer(incoming);

    if rejected.is_some() {
        debug!(%peer, "no connection listener installed; closing socket");
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    debug!(%peer, "websocket connected");

    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            outbound = out_rx.recv() => match outbound {
                Some(payload) => {
                    if sink.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                None => {
                    // Every `Connection` handle is gone: the client was dropped.
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            inbound = stream.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    if in_tx.send(text.as_str().to_owned()).is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                    Ok(text) => {
                        if in_tx.send(text).is_err() {
                            break;
                        }
                    }
                    Err(_) => debug!(%peer, "dropping non-UTF-8 binary frame"),
                },
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!(%peer, error = %err, "websocket read failed");
                    break;
                }
            },
        }
    }

    debug!(%peer, "websocket disconnected");
}
