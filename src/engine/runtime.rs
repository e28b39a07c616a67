// src/engine/runtime.rs

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::fs::FileSystem;
use crate::transport::IncomingConnection;
use crate::types::ClientId;

use super::dispatcher::Dispatcher;
use super::loader::read_contents;
use super::{EngineEvent, FileContents};

/// Drives the [`Dispatcher`] in response to [`EngineEvent`]s and accepted
/// connections.
///
/// This is a pure IO shell around `Dispatcher`, which contains all the
/// broadcast and settings semantics. This struct handles async IO: reading
/// events from channels and wiring each accepted connection's inbound stream
/// back into the event channel.
pub struct Runtime {
    dispatcher: Dispatcher,
    fs: Arc<dyn FileSystem>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
    connections_rx: mpsc::UnboundedReceiver<IncomingConnection>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// Build the runtime. The returned sender feeds the event channel (watch
    /// events from the content loader, defaults updates, shutdown).
    pub fn new(
        dispatcher: Dispatcher,
        fs: Arc<dyn FileSystem>,
        connections_rx: mpsc::UnboundedReceiver<IncomingConnection>,
    ) -> (Self, mpsc::UnboundedSender<EngineEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let runtime = Self {
            dispatcher,
            fs,
            events_tx: events_tx.clone(),
            events_rx,
            connections_rx,
        };
        (runtime, events_tx)
    }

    /// Main event loop.
    ///
    /// - Registers accepted connections and starts forwarding their inbound
    ///   frames.
    /// - Feeds every other event into the dispatcher, reading contents first
    ///   for unread add/change events that a client wants by now.
    /// - Exits on `EngineEvent::Shutdown`, dropping every client connection.
    pub async fn run(mut self) {
        info!("dispatch loop started");

        let mut accepting = true;
        loop {
            tokio::select! {
                event = self.events_rx.recv() => {
                    let Some(event) = event else {
                        break;
                    };
                    let event = self.fill_contents(event).await;
                    if !self.dispatcher.step(event) {
                        info!("shutdown requested; stopping dispatch loop");
                        break;
                    }
                }
                incoming = self.connections_rx.recv(), if accepting => match incoming {
                    Some(incoming) => self.accept(incoming),
                    None => {
                        debug!("connection listener removed");
                        accepting = false;
                    }
                },
            }
        }

        info!(
            clients = self.dispatcher.registry().len(),
            "dispatch loop exiting"
        );
    }

    /// The content loader only reads ahead while contents are in demand. A
    /// client that asked for contents after its event was loaded still gets
    /// them; later events wait in the channel meanwhile.
    async fn fill_contents(&self, event: EngineEvent) -> EngineEvent {
        match event {
            EngineEvent::Watch {
                event,
                contents: FileContents::NotLoaded,
            } if self.dispatcher.needs_contents(&event) => {
                debug!(path = ?event.path, "contents wanted since load; reading now");
                let contents = read_contents(&self.fs, &event).await;
                EngineEvent::Watch { event, contents }
            }
            other => other,
        }
    }

    /// Register a connection before any of its frames can be processed.
    fn accept(&mut self, incoming: IncomingConnection) {
        let IncomingConnection {
            connection,
            inbound,
            peer,
        } = incoming;

        let client = self.dispatcher.register(connection);
        info!(%client, ?peer, clients = self.dispatcher.registry().len(), "client connected");

        tokio::spawn(forward_inbound(client, inbound, self.events_tx.clone()));
    }
}

/// Tag one connection's inbound frames with its client id and report the
/// close once the stream ends.
async fn forward_inbound(
    client: ClientId,
    mut inbound: mpsc::UnboundedReceiver<String>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
) {
    while let Some(payload) = inbound.recv().await {
        if events_tx
            .send(EngineEvent::Message { client, payload })
            .is_err()
        {
            return;
        }
    }
    let _ = events_tx.send(EngineEvent::Closed { client });
}
