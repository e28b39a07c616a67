// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - The [`Watcher`] seam the lifecycle controller consumes.
//! - Compiling the `ignored` list into an [`IgnoreSet`].
//! - Wiring up a cross-platform filesystem watcher (`notify`) and mapping
//!   its events onto the five [`WatchEventKind`](crate::types::WatchEventKind)s.
//! - Path rewriting helpers used when delivering events.
//!
//! It does **not** know about clients or settings; it only turns filesystem
//! changes into [`WatchEvent`]s.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::errors::Result;
use crate::listeners::ListenerHandle;
use crate::types::WatchEvent;

pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use patterns::IgnoreSet;
pub use watcher::{NotifyWatcher, WatcherOptions};

/// Listener for watch events. One listener receives every event kind.
pub type WatchListener = mpsc::UnboundedSender<WatchEvent>;

/// Source of filesystem change events.
pub trait Watcher: Send {
    /// Install a listener for all event kinds.
    fn subscribe(&mut self, listener: WatchListener) -> ListenerHandle;

    /// Remove a listener previously returned by [`Watcher::subscribe`].
    fn unsubscribe(&mut self, handle: ListenerHandle) -> bool;

    /// Start watching `paths` (files or directories, recursively).
    fn add(&mut self, paths: &[PathBuf]) -> Result<()>;

    /// Stop watching `paths`. Paths that are not watched are skipped.
    fn unwatch(&mut self, paths: &[PathBuf]) -> Result<()>;

    /// Number of installed listeners.
    fn listener_count(&self) -> usize;
}
