// tests/path_rewrite_props.rs

#![cfg(unix)]

use std::path::{Path, PathBuf};

use proptest::prelude::*;
use watch_remotely::watch::path_utils::{relative_to, rewrite_path};

fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9_-]{1,8}"
}

fn segments(max: usize) -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec(segment(), 0..max)
}

fn absolute(parts: &[String]) -> PathBuf {
    let mut path = PathBuf::from("/");
    for part in parts {
        path.push(part);
    }
    path
}

proptest! {
    #[test]
    fn absolute_mode_returns_the_path_unchanged(
        path in segments(6),
        base in segments(6),
    ) {
        let path = absolute(&path);
        let out = rewrite_path(&path, &absolute(&base), false).unwrap();
        prop_assert_eq!(out, path.to_string_lossy().into_owned());
    }

    #[test]
    fn paths_below_the_base_lose_the_base_prefix(
        base in segments(5),
        rest in segments(5),
    ) {
        let base_path = absolute(&base);
        let path = absolute(&[base.clone(), rest.clone()].concat());

        let out = rewrite_path(&path, &base_path, true).unwrap();
        prop_assert_eq!(out, rest.join("/"));
    }

    #[test]
    fn relative_result_leads_back_to_the_path(
        path in segments(6),
        base in segments(6),
    ) {
        let path = absolute(&path);
        let base = absolute(&base);

        let rel = relative_to(&path, &base).unwrap();
        prop_assert!(rel.is_relative() || rel.as_os_str().is_empty());

        // Resolving `..` lexically against the base gives back the event path.
        let mut resolved = base.clone();
        for component in rel.components() {
            match component.as_os_str().to_str() {
                Some("..") => {
                    resolved.pop();
                }
                _ => resolved.push(component),
            }
        }
        prop_assert_eq!(resolved, path);
    }
}

#[test]
fn dot_segments_are_normalized_before_rewriting() {
    let out = rewrite_path(
        Path::new("/base/./sub/../sub/file.js"),
        Path::new("/base/"),
        true,
    )
    .unwrap();
    assert_eq!(out, "sub/file.js");
}
