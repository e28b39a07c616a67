// src/engine/mod.rs

//! Event broadcast engine.
//!
//! This module ties together:
//! - the client registry and per-client settings
//! - the in-band settings protocol
//! - the content loader that reads each changed file at most once
//! - the dispatch loop that reacts to:
//!   - watch events (with or without loaded contents)
//!   - accepted connections, inbound client messages and closes
//!   - default-settings updates and shutdown
//!
//! The synchronous dispatcher lives in [`dispatcher`]; the async/IO shell is
//! implemented in [`runtime`] and [`loader`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::protocol::EffectiveSettings;
use crate::types::{ClientId, WatchEvent};

pub mod dispatcher;
pub mod loader;
pub mod registry;
pub mod runtime;
pub mod settings_protocol;

pub use dispatcher::{BroadcastReport, Dispatcher};
pub use loader::{read_contents, run_content_loader};
pub use registry::{Client, ClientRegistry};
pub use runtime::Runtime;
pub use settings_protocol::{handle_client_message, MessageOutcome};

/// File contents attached to a watch event by the content loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContents {
    /// The file was read successfully.
    Loaded(String),
    /// A read was attempted and failed.
    Unavailable,
    /// Not read: the event kind never carries contents, or nobody wanted
    /// them when the event was loaded. The dispatch loop reads late if a
    /// client wants them by then.
    NotLoaded,
}

impl FileContents {
    pub fn as_deref(&self) -> Option<&str> {
        match self {
            FileContents::Loaded(text) => Some(text),
            FileContents::Unavailable | FileContents::NotLoaded => None,
        }
    }
}

/// Events flowing into the dispatch loop.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// A watcher event, after the content loader is done with it.
    Watch {
        event: WatchEvent,
        contents: FileContents,
    },
    /// A client sent a text frame.
    Message { client: ClientId, payload: String },
    /// A client's connection closed.
    Closed { client: ClientId },
    /// Replace the process-wide default settings.
    DefaultsChanged(EffectiveSettings),
    /// Stop the dispatch loop; drops every client.
    Shutdown,
}

/// Shared flag telling the content loader whether anybody wants contents.
///
/// The dispatcher refreshes it after every registry or defaults change; the
/// loader only reads it.
#[derive(Debug, Clone, Default)]
pub struct ContentsDemand(Arc<AtomicBool>);

impl ContentsDemand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, wanted: bool) {
        self.0.store(wanted, Ordering::Release);
    }

    pub fn is_wanted(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
