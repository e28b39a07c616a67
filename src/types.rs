use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of filesystem change reported by a watcher.
///
/// The serialized names are the `event` values clients see on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchEventKind {
    Added,
    Changed,
    Removed,
    DirectoryAdded,
    DirectoryRemoved,
}

impl WatchEventKind {
    pub const ALL: [WatchEventKind; 5] = [
        WatchEventKind::Added,
        WatchEventKind::Changed,
        WatchEventKind::Removed,
        WatchEventKind::DirectoryAdded,
        WatchEventKind::DirectoryRemoved,
    ];

    /// Wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            WatchEventKind::Added => "added",
            WatchEventKind::Changed => "changed",
            WatchEventKind::Removed => "removed",
            WatchEventKind::DirectoryAdded => "directory-added",
            WatchEventKind::DirectoryRemoved => "directory-removed",
        }
    }

    /// Only file additions and modifications can be delivered with contents.
    pub fn carries_contents(self) -> bool {
        matches!(self, WatchEventKind::Added | WatchEventKind::Changed)
    }
}

impl fmt::Display for WatchEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WatchEventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WatchEventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s.trim())
            .ok_or_else(|| format!("unknown watch event kind: {s}"))
    }
}

/// A single change reported by the watcher. `path` is absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub kind: WatchEventKind,
    pub path: PathBuf,
}

impl WatchEvent {
    pub fn new(kind: WatchEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Process-unique identifier of a connected client. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClientId(u64);

impl ClientId {
    pub(crate) fn new(raw: u64) -> Self {
        ClientId(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
