// src/engine/dispatcher.rs

//! Synchronous dispatcher state machine.
//!
//! The dispatcher owns the client registry and the process-wide defaults and
//! turns [`EngineEvent`]s into per-client sends. It never awaits: file
//! contents arrive already loaded, and sends go into unbounded per-connection
//! queues. Every registry mutation and iteration therefore happens inside one
//! call, so no other handler can observe a half-updated registry.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::engine::registry::ClientRegistry;
use crate::engine::settings_protocol::{handle_client_message, MessageOutcome};
use crate::engine::{ContentsDemand, EngineEvent, FileContents};
use crate::protocol::{BroadcastPayload, EffectiveSettings};
use crate::transport::Connection;
use crate::types::{ClientId, WatchEvent, WatchEventKind};
use crate::watch::path_utils::rewrite_path;

/// Result of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Payloads queued on a live connection.
    pub delivered: usize,
    /// Clients that got nothing for this event.
    pub skipped: usize,
}

#[derive(Debug)]
pub struct Dispatcher {
    defaults: EffectiveSettings,
    registry: ClientRegistry,
    demand: ContentsDemand,
}

impl Dispatcher {
    pub fn new(defaults: EffectiveSettings, demand: ContentsDemand) -> Self {
        let dispatcher = Self {
            defaults,
            registry: ClientRegistry::new(),
            demand,
        };
        dispatcher.refresh_demand();
        dispatcher
    }

    pub fn defaults(&self) -> &EffectiveSettings {
        &self.defaults
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    pub fn set_defaults(&mut self, defaults: EffectiveSettings) {
        info!(
            base_path = %defaults.base_path,
            relative_paths = defaults.relative_paths,
            with_contents = defaults.with_contents,
            "default settings updated"
        );
        self.defaults = defaults;
        self.refresh_demand();
    }

    pub fn register(&mut self, connection: Connection) -> ClientId {
        let id = self.registry.register(connection);
        self.refresh_demand();
        id
    }

    pub fn unregister(&mut self, id: ClientId) -> bool {
        let removed = self.registry.unregister(id).is_some();
        self.refresh_demand();
        removed
    }

    pub fn handle_message(&mut self, client: ClientId, text: &str) -> MessageOutcome {
        let outcome = handle_client_message(&mut self.registry, &self.defaults, client, text);
        if matches!(outcome, MessageOutcome::Acknowledged(_)) {
            self.refresh_demand();
        }
        outcome
    }

    /// Whether `event` should carry contents for at least one current client.
    pub fn needs_contents(&self, event: &WatchEvent) -> bool {
        event.kind.carries_contents() && self.registry.wants_contents(&self.defaults)
    }

    /// Handle a single engine event. Returns false once the loop should stop.
    pub fn step(&mut self, event: EngineEvent) -> bool {
        match event {
            EngineEvent::Watch { event, contents } => {
                self.handle_watch_event(&event, &contents);
            }
            EngineEvent::Message { client, payload } => {
                self.handle_message(client, &payload);
            }
            EngineEvent::Closed { client } => {
                if self.unregister(client) {
                    info!(%client, remaining = self.registry.len(), "client disconnected");
                }
            }
            EngineEvent::DefaultsChanged(defaults) => self.set_defaults(defaults),
            EngineEvent::Shutdown => return false,
        }
        true
    }

    pub fn handle_watch_event(
        &mut self,
        event: &WatchEvent,
        contents: &FileContents,
    ) -> BroadcastReport {
        let report = self.broadcast(event.kind, &event.path, contents.as_deref());
        debug!(
            event = %event.kind,
            path = ?event.path,
            delivered = report.delivered,
            skipped = report.skipped,
            "broadcast watch event"
        );
        report
    }

    /// Send one tailored payload per registered client.
    ///
    /// A client whose effective settings ask for contents gets nothing for an
    /// add/change event when `contents` is `None`; callers read late for
    /// unread events (see [`Dispatcher::needs_contents`]), so `None` here
    /// means the read failed. Path rewrite failures and
    /// closed connections only affect the client concerned.
    pub fn broadcast(
        &self,
        kind: WatchEventKind,
        path: &Path,
        contents: Option<&str>,
    ) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for client in self.registry.iter() {
            let settings = client.effective_settings(&self.defaults);

            let client_contents = if kind.carries_contents() && settings.with_contents {
                match contents {
                    Some(text) => Some(text),
                    None => {
                        debug!(client = %client.id, ?path, "contents unavailable; skipping client");
                        report.skipped += 1;
                        continue;
                    }
                }
            } else {
                None
            };

            let client_path = match rewrite_path(
                path,
                Path::new(&settings.base_path),
                settings.relative_paths,
            ) {
                Ok(p) => p,
                Err(err) => {
                    warn!(client = %client.id, ?path, error = %err, "failed to rewrite path");
                    report.skipped += 1;
                    continue;
                }
            };

            let payload = BroadcastPayload {
                event: kind,
                path: &client_path,
                contents: client_contents,
            };
            let json = match payload.to_json() {
                Ok(json) => json,
                Err(err) => {
                    warn!(client = %client.id, error = %err, "failed to serialize payload");
                    report.skipped += 1;
                    continue;
                }
            };

            match client.connection.send(json) {
                Ok(()) => report.delivered += 1,
                Err(_) => {
                    debug!(client = %client.id, "connection already closed; dropping payload");
                    report.skipped += 1;
                }
            }
        }

        report
    }

    fn refresh_demand(&self) {
        self.demand.set(self.registry.wants_contents(&self.defaults));
    }
}
