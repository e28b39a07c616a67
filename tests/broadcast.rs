// tests/broadcast.rs

mod common;
use crate::common::{defaults, Harness};

use serde_json::json;
use watch_remotely::types::WatchEventKind;

#[tokio::test]
async fn default_client_gets_absolute_path_without_contents() {
    let h = Harness::running(defaults());
    h.fs.add_file("/project/src/app.js", "hello");
    let mut client = h.connect().await;

    h.emit(WatchEventKind::Changed, "/project/src/app.js");

    assert_eq!(
        client.recv_json().await,
        json!({ "event": "changed", "path": "/project/src/app.js" })
    );
}

#[tokio::test]
async fn every_event_kind_uses_its_wire_name() {
    let h = Harness::running(defaults());
    let mut client = h.connect().await;

    let events = [
        (WatchEventKind::Added, "added"),
        (WatchEventKind::Changed, "changed"),
        (WatchEventKind::Removed, "removed"),
        (WatchEventKind::DirectoryAdded, "directory-added"),
        (WatchEventKind::DirectoryRemoved, "directory-removed"),
    ];
    for (kind, _) in events {
        h.emit(kind, "/project/x");
    }

    // Emission order is preserved per client.
    for (_, name) in events {
        let payload = client.recv_json().await;
        assert_eq!(payload["event"], name);
        assert_eq!(payload["path"], "/project/x");
    }
}

#[tokio::test]
async fn relative_client_gets_path_relative_to_base() {
    let h = Harness::running(defaults());
    let mut client = h.connect().await;
    client.send_settings(json!({ "relativePaths": true, "basePath": "/project/src" }));
    client.recv_json().await;

    h.emit(WatchEventKind::Added, "/project/src/sub/file.js");
    h.emit(WatchEventKind::Added, "/project/lib/other.js");

    assert_eq!(
        client.recv_json().await,
        json!({ "event": "added", "path": "sub/file.js" })
    );
    assert_eq!(
        client.recv_json().await,
        json!({ "event": "added", "path": "../lib/other.js" })
    );
}

#[tokio::test]
async fn contents_client_gets_file_contents() {
    let h = Harness::running(defaults());
    h.fs.add_file("/project/a.js", "hello");
    let mut client = h.connect().await;
    client.send_settings(json!({ "withContents": true }));
    client.recv_json().await;

    h.emit(WatchEventKind::Changed, "/project/a.js");

    assert_eq!(
        client.recv_json().await,
        json!({ "event": "changed", "path": "/project/a.js", "contents": "hello" })
    );
}

#[tokio::test]
async fn change_right_after_contents_request_is_never_lost() {
    let h = Harness::running(defaults());
    h.fs.add_file("/project/a.js", "hello");

    for _ in 0..20 {
        let mut client = h.connect().await;
        client.send_settings(json!({ "withContents": true }));
        h.emit(WatchEventKind::Changed, "/project/a.js");

        // Whichever the loop handles first, the change arrives exactly once
        // and matches the settings in force at dispatch.
        let first = client.recv_json().await;
        let second = client.recv_json().await;
        if first["event"] == "settings" {
            assert_eq!(
                second,
                json!({ "event": "changed", "path": "/project/a.js", "contents": "hello" })
            );
        } else {
            assert_eq!(first, json!({ "event": "changed", "path": "/project/a.js" }));
            assert_eq!(second["event"], "settings");
        }
        assert!(client.try_recv().is_none());
        client.close();
        assert!(client.is_disconnected().await);
    }
}

#[tokio::test]
async fn removals_never_carry_contents() {
    let h = Harness::running(defaults().with_file_contents(true));
    let mut client = h.connect().await;

    h.emit(WatchEventKind::Removed, "/project/a.js");
    h.emit(WatchEventKind::DirectoryAdded, "/project/dir");

    assert_eq!(
        client.recv_json().await,
        json!({ "event": "removed", "path": "/project/a.js" })
    );
    assert_eq!(
        client.recv_json().await,
        json!({ "event": "directory-added", "path": "/project/dir" })
    );
}

#[tokio::test]
async fn clients_with_different_settings_get_tailored_payloads() {
    let h = Harness::running(defaults());
    h.fs.add_file("/project/src/app.js", "body");

    let mut plain = h.connect().await;
    let mut relative = h.connect().await;
    relative.send_settings(json!({ "relativePaths": true }));
    relative.recv_json().await;
    let mut full = h.connect().await;
    full.send_settings(json!({ "relativePaths": true, "withContents": true }));
    full.recv_json().await;

    h.emit(WatchEventKind::Added, "/project/src/app.js");

    assert_eq!(
        plain.recv_json().await,
        json!({ "event": "added", "path": "/project/src/app.js" })
    );
    assert_eq!(
        relative.recv_json().await,
        json!({ "event": "added", "path": "src/app.js" })
    );
    assert_eq!(
        full.recv_json().await,
        json!({ "event": "added", "path": "src/app.js", "contents": "body" })
    );
}

#[tokio::test]
async fn read_failure_skips_only_clients_that_need_contents() {
    let h = Harness::running(defaults());
    let mut wants = h.connect().await;
    wants.send_settings(json!({ "withContents": true }));
    wants.recv_json().await;
    let mut plain = h.connect().await;

    h.emit(WatchEventKind::Changed, "/project/missing.js");

    assert_eq!(
        plain.recv_json().await,
        json!({ "event": "changed", "path": "/project/missing.js" })
    );
    // Both sends happen in one dispatch step, so nothing more is coming.
    assert!(wants.try_recv().is_none());

    // Watching goes on.
    h.fs.add_file("/project/present.js", "ok");
    h.emit(WatchEventKind::Added, "/project/present.js");
    assert_eq!(
        wants.recv_json().await,
        json!({ "event": "added", "path": "/project/present.js", "contents": "ok" })
    );
}

#[tokio::test]
async fn closed_client_is_skipped_and_disconnected() {
    let h = Harness::running(defaults());
    let mut gone = h.connect().await;
    let mut stays = h.connect().await;

    gone.close();
    assert!(gone.is_disconnected().await);

    h.emit(WatchEventKind::Changed, "/project/a.js");
    assert_eq!(
        stays.recv_json().await,
        json!({ "event": "changed", "path": "/project/a.js" })
    );

    // Later clients get fresh ids and work normally.
    let mut late = h.connect().await;
    h.emit(WatchEventKind::Removed, "/project/a.js");
    assert_eq!(late.recv_json().await["event"], "removed");
    assert_eq!(stays.recv_json().await["event"], "removed");
}
