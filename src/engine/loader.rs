// src/engine/loader.rs

//! Content loading stage between the watcher and the dispatch loop.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::engine::{ContentsDemand, EngineEvent, FileContents};
use crate::fs::FileSystem;
use crate::types::WatchEvent;

/// Consume watch events in emission order, attach file contents when someone
/// may need them, and forward them to the dispatch loop.
///
/// Events are handled one at a time, so the dispatch loop sees them in the
/// order the watcher produced them even though reads are asynchronous. The
/// dispatch loop keeps handling connections and messages while a read is
/// pending.
pub async fn run_content_loader(
    mut watch_rx: mpsc::UnboundedReceiver<WatchEvent>,
    fs: Arc<dyn FileSystem>,
    demand: ContentsDemand,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
) {
    while let Some(event) = watch_rx.recv().await {
        debug!(event = %event.kind, path = ?event.path, "received watch event");

        let contents = load_contents(&fs, &event, &demand).await;

        if events_tx.send(EngineEvent::Watch { event, contents }).is_err() {
            debug!("dispatch loop gone; content loader exiting");
            return;
        }
    }
    debug!("watch stream closed; content loader exiting");
}

/// Read the file behind `event` once, if the event can carry contents and
/// anybody currently wants them.
pub async fn load_contents(
    fs: &Arc<dyn FileSystem>,
    event: &WatchEvent,
    demand: &ContentsDemand,
) -> FileContents {
    if !event.kind.carries_contents() || !demand.is_wanted() {
        return FileContents::NotLoaded;
    }
    read_contents(fs, event).await
}

/// Read the file behind `event` on the blocking pool.
pub async fn read_contents(fs: &Arc<dyn FileSystem>, event: &WatchEvent) -> FileContents {
    let fs = Arc::clone(fs);
    let path = event.path.clone();

    match tokio::task::spawn_blocking(move || fs.read_text(&path)).await {
        Ok(Ok(text)) => FileContents::Loaded(text),
        Ok(Err(err)) => {
            warn!(
                path = ?event.path,
                error = %format!("{err:#}"),
                "failed to read file contents; clients that need them skip this event"
            );
            FileContents::Unavailable
        }
        Err(err) => {
            warn!(path = ?event.path, error = %err, "file read task failed");
            FileContents::Unavailable
        }
    }
}
