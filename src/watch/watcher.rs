// src/watch/watcher.rs

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use notify::event::{CreateKind, MetadataKind, ModifyKind, RemoveKind, RenameMode};
use notify::Watcher as _;
use notify::{Config, Event, EventKind, PollWatcher, RecommendedWatcher, RecursiveMode};
use tracing::{debug, info, trace, warn};

use crate::errors::{Result, WatchRemotelyError};
use crate::fs::{FileSystem, RealFileSystem};
use crate::listeners::{ListenerHandle, Listeners};
use crate::types::{WatchEvent, WatchEventKind};
use crate::watch::path_utils::absolutize;
use crate::watch::patterns::{IgnoreSet, collect_entries};
use crate::watch::{WatchListener, Watcher};

/// Options for [`NotifyWatcher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherOptions {
    /// Skip the `added` / `directory-added` burst for entries that already
    /// exist when a path is added.
    pub ignore_initial: bool,
    /// Use `notify::PollWatcher` instead of the platform backend.
    pub use_polling: bool,
    pub poll_interval: Duration,
    /// Plain paths (ignored with their subtree) or globs.
    pub ignored: Vec<String>,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            ignore_initial: true,
            use_polling: false,
            poll_interval: Duration::from_millis(100),
            ignored: Vec::new(),
        }
    }
}

/// State shared with the `notify` callback thread.
struct Shared {
    listeners: Mutex<Listeners<WatchEvent>>,
    known_dirs: Mutex<BTreeSet<PathBuf>>,
    ignore: IgnoreSet,
    fs: Arc<dyn FileSystem>,
}

impl Shared {
    fn new(ignore: IgnoreSet, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            listeners: Mutex::new(Listeners::new()),
            known_dirs: Mutex::new(BTreeSet::new()),
            ignore,
            fs,
        }
    }

    fn handle(&self, event: &Event) {
        trace!(?event, "received notify event");

        let events = {
            let mut known_dirs = lock(&self.known_dirs);
            classify(event, self.fs.as_ref(), &mut known_dirs)
        };

        for event in events {
            if self.ignore.is_ignored(&event.path) {
                trace!(path = ?event.path, "ignored path");
                continue;
            }
            self.emit(&event);
        }
    }

    fn emit(&self, event: &WatchEvent) {
        let listeners = lock(&self.listeners).emit(event);
        debug!(event = %event.kind, path = ?event.path, listeners, "watch event");
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// [`Watcher`] backed by `notify`.
///
/// Dropping it stops file watching.
pub struct NotifyWatcher {
    inner: Box<dyn notify::Watcher + Send>,
    shared: Arc<Shared>,
    options: WatcherOptions,
    watched: BTreeSet<PathBuf>,
}

impl fmt::Debug for NotifyWatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyWatcher")
            .field("options", &self.options)
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

impl NotifyWatcher {
    pub fn new(options: WatcherOptions) -> Result<Self> {
        Self::with_file_system(options, Arc::new(RealFileSystem))
    }

    /// Build a watcher that inspects paths through `fs` (directory checks,
    /// the initial walk).
    pub fn with_file_system(options: WatcherOptions, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let ignore = IgnoreSet::new(&options.ignored)
            .map_err(|err| WatchRemotelyError::ConfigError(format!("{err:#}")))?;
        let shared = Arc::new(Shared::new(ignore, fs));

        // Called synchronously by notify on its own thread.
        let handler = {
            let shared = Arc::clone(&shared);
            move |res: notify::Result<Event>| match res {
                Ok(event) => shared.handle(&event),
                Err(err) => warn!(error = %err, "file watch error"),
            }
        };

        let inner: Box<dyn notify::Watcher + Send> = if options.use_polling {
            let config = Config::default().with_poll_interval(options.poll_interval);
            Box::new(PollWatcher::new(handler, config)?)
        } else {
            Box::new(RecommendedWatcher::new(handler, Config::default())?)
        };

        Ok(Self {
            inner,
            shared,
            options,
            watched: BTreeSet::new(),
        })
    }

    /// Absolute paths currently registered with the backend.
    pub fn watched_paths(&self) -> impl Iterator<Item = &Path> {
        self.watched.iter().map(PathBuf::as_path)
    }

    /// Record the directories below `root` and return every non-ignored
    /// entry, `root` first.
    fn index(&self, root: &Path) -> Result<Vec<(PathBuf, bool)>> {
        let fs = self.shared.fs.as_ref();
        let entries = if fs.is_dir(root) {
            let mut entries = vec![(root.to_path_buf(), true)];
            entries.extend(collect_entries(fs, root, &self.shared.ignore)?);
            entries
        } else {
            vec![(root.to_path_buf(), false)]
        };

        lock(&self.shared.known_dirs).extend(
            entries
                .iter()
                .filter(|(_, is_dir)| *is_dir)
                .map(|(path, _)| path.clone()),
        );
        Ok(entries)
    }
}

impl Watcher for NotifyWatcher {
    fn subscribe(&mut self, listener: WatchListener) -> ListenerHandle {
        lock(&self.shared.listeners).subscribe(listener)
    }

    fn unsubscribe(&mut self, handle: ListenerHandle) -> bool {
        lock(&self.shared.listeners).unsubscribe(handle)
    }

    fn add(&mut self, paths: &[PathBuf]) -> Result<()> {
        for path in paths {
            let path = absolutize(path)?;
            if self.watched.contains(&path) {
                debug!(?path, "path already watched");
                continue;
            }
            if self.shared.ignore.is_ignored(&path) {
                debug!(?path, "not watching ignored path");
                continue;
            }

            self.inner.watch(&path, RecursiveMode::Recursive)?;
            self.watched.insert(path.clone());

            let entries = self.index(&path)?;
            info!(?path, entries = entries.len(), "file watcher started");

            if !self.options.ignore_initial {
                for (entry, is_dir) in entries {
                    let kind = if is_dir {
                        WatchEventKind::DirectoryAdded
                    } else {
                        WatchEventKind::Added
                    };
                    self.shared.emit(&WatchEvent::new(kind, entry));
                }
            }
        }
        Ok(())
    }

    fn unwatch(&mut self, paths: &[PathBuf]) -> Result<()> {
        for path in paths {
            let path = absolutize(path)?;
            if !self.watched.remove(&path) {
                continue;
            }
            self.inner.unwatch(&path)?;
            lock(&self.shared.known_dirs).retain(|dir| !dir.starts_with(&path));
            info!(?path, "file watcher stopped");
        }
        Ok(())
    }

    fn listener_count(&self) -> usize {
        lock(&self.shared.listeners).len()
    }
}

/// Map one `notify` event onto zero or more [`WatchEvent`]s.
///
/// `known_dirs` is the set of directories seen so far. It decides between
/// `removed` and `directory-removed` when the backend does not say, and is
/// updated as directories come and go.
pub fn classify(
    event: &Event,
    fs: &dyn FileSystem,
    known_dirs: &mut BTreeSet<PathBuf>,
) -> Vec<WatchEvent> {
    let mut out = Vec::new();

    match event.kind {
        EventKind::Create(kind) => {
            for path in &event.paths {
                let is_dir = match kind {
                    CreateKind::Folder => true,
                    CreateKind::File => false,
                    CreateKind::Any | CreateKind::Other => fs.is_dir(path),
                };
                out.push(addition(path, is_dir, known_dirs));
            }
        }
        // Pollers report writes as mtime updates.
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::WriteTime)) => {
            for path in &event.paths {
                if !known_dirs.contains(path) && !fs.is_dir(path) {
                    out.push(WatchEvent::new(WatchEventKind::Changed, path.clone()));
                }
            }
        }
        EventKind::Modify(ModifyKind::Metadata(_)) => {}
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => {
                for path in &event.paths {
                    out.push(removal(path, None, known_dirs));
                }
            }
            RenameMode::To => {
                for path in &event.paths {
                    out.push(addition(path, fs.is_dir(path), known_dirs));
                }
            }
            RenameMode::Both => {
                if let [from, to] = event.paths.as_slice() {
                    out.push(removal(from, None, known_dirs));
                    out.push(addition(to, fs.is_dir(to), known_dirs));
                }
            }
            RenameMode::Any | RenameMode::Other => {
                for path in &event.paths {
                    if fs.exists(path) {
                        out.push(addition(path, fs.is_dir(path), known_dirs));
                    } else {
                        out.push(removal(path, None, known_dirs));
                    }
                }
            }
        },
        EventKind::Modify(_) => {
            for path in &event.paths {
                // Directory mtime updates are not content changes.
                if known_dirs.contains(path) || fs.is_dir(path) {
                    continue;
                }
                out.push(WatchEvent::new(WatchEventKind::Changed, path.clone()));
            }
        }
        EventKind::Remove(kind) => {
            let hint = match kind {
                RemoveKind::Folder => Some(true),
                RemoveKind::File => Some(false),
                RemoveKind::Any | RemoveKind::Other => None,
            };
            for path in &event.paths {
                out.push(removal(path, hint, known_dirs));
            }
        }
        EventKind::Access(_) | EventKind::Any | EventKind::Other => {}
    }

    out
}

fn addition(path: &Path, is_dir: bool, known_dirs: &mut BTreeSet<PathBuf>) -> WatchEvent {
    if is_dir {
        known_dirs.insert(path.to_path_buf());
        WatchEvent::new(WatchEventKind::DirectoryAdded, path)
    } else {
        WatchEvent::new(WatchEventKind::Added, path)
    }
}

fn removal(path: &Path, is_dir: Option<bool>, known_dirs: &mut BTreeSet<PathBuf>) -> WatchEvent {
    let was_dir = is_dir.unwrap_or_else(|| known_dirs.contains(path));
    known_dirs.retain(|dir| !dir.starts_with(path));
    if was_dir {
        WatchEvent::new(WatchEventKind::DirectoryRemoved, path)
    } else {
        WatchEvent::new(WatchEventKind::Removed, path)
    }
}
