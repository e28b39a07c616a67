// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::fs::FileSystem;

/// Compiled `ignored` list for the watcher.
///
/// Each entry is used two ways:
///
/// - as a plain path: that path and everything below it is ignored
///   (e.g. `"/project/jspm_packages"`);
/// - as a glob matched against the full event path
///   (e.g. `"**/node_modules/**"`, `"**/*.swp"`).
#[derive(Clone, Default)]
pub struct IgnoreSet {
    prefixes: Vec<PathBuf>,
    globs: Option<GlobSet>,
    patterns: Vec<String>,
}

impl fmt::Debug for IgnoreSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IgnoreSet")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl IgnoreSet {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let prefixes = patterns.iter().map(PathBuf::from).collect();
        let globs = if patterns.is_empty() {
            None
        } else {
            Some(build_globset(patterns).context("building ignore globset")?)
        };

        Ok(Self {
            prefixes,
            globs,
            patterns: patterns.to_vec(),
        })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.prefixes.iter().any(|prefix| path.starts_with(prefix)) {
            return true;
        }
        match &self.globs {
            Some(globs) => globs.is_match(path),
            None => false,
        }
    }
}

/// Build a GlobSet from simple string patterns.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Walk everything below `root` that is not ignored.
///
/// Returns `(path, is_dir)` pairs, parents before children. Used for the
/// directory index and the optional initial add burst.
pub fn collect_entries(
    fs: &dyn FileSystem,
    root: &Path,
    ignore: &IgnoreSet,
) -> Result<Vec<(PathBuf, bool)>> {
    let mut entries = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut children = fs.read_dir(&dir)?;
        // Reverse so that popping visits siblings in sorted order.
        children.sort();
        for path in children.iter().rev() {
            if ignore.is_ignored(path) {
                continue;
            }
            if fs.is_dir(path) {
                stack.push(path.clone());
            }
        }
        for path in children {
            if ignore.is_ignored(&path) {
                continue;
            }
            let is_dir = fs.is_dir(&path);
            entries.push((path, is_dir));
        }
    }

    Ok(entries)
}
