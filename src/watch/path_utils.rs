// src/watch/path_utils.rs

//! Path helpers shared by the watcher and the dispatcher.

use std::path::{Component, Path, PathBuf};

use crate::errors::{Result, WatchRemotelyError};

/// Rewrite an event path into the form a client asked for.
///
/// - `relative == false`: `path` is returned unchanged.
/// - `relative == true`: `path` relative to `base`, using `..` for segments of
///   `base` that `path` does not share. Equal paths yield an empty string.
///
/// Relative inputs are resolved against the working directory first.
pub fn rewrite_path(path: &Path, base: &Path, relative: bool) -> Result<String> {
    if !relative {
        return Ok(path.to_string_lossy().into_owned());
    }

    let rel = relative_to(path, base)?;
    Ok(rel.to_string_lossy().into_owned())
}

/// Compute `path` relative to `base` (both made absolute and normalized).
pub fn relative_to(path: &Path, base: &Path) -> Result<PathBuf> {
    let path = absolutize(path)?;
    let base = absolutize(base)?;

    let path_parts: Vec<Component<'_>> = path.components().collect();
    let base_parts: Vec<Component<'_>> = base.components().collect();

    // Different roots (e.g. Windows drive letters) cannot be related.
    if path_parts.first() != base_parts.first() {
        return Err(WatchRemotelyError::PathError(format!(
            "{:?} and {:?} do not share a root",
            path, base
        )));
    }

    let common = path_parts
        .iter()
        .zip(base_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base_parts.len() {
        rel.push("..");
    }
    for part in &path_parts[common..] {
        rel.push(part.as_os_str());
    }
    Ok(rel)
}

/// Make `path` absolute against the working directory and drop `.`/`..`
/// segments lexically.
pub fn absolutize(path: &Path) -> Result<PathBuf> {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Ok(normalize(&joined))
}

fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `pop` refuses to remove the root, which is what we want.
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
