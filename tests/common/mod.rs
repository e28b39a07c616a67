#![allow(dead_code)]

use std::sync::Arc;

use watch_remotely::fs::mock::MockFileSystem;
use watch_remotely::protocol::EffectiveSettings;
use watch_remotely::server::HmrServer;
use watch_remotely::types::WatchEventKind;

pub use watch_remotely_test_utils::{
    init_tracing, within_deadline, FakeClient, FakeConnectionServer, FakeWatcher,
};

pub const PROJECT: &str = "/project";

pub type TestServer = HmrServer<FakeWatcher, FakeConnectionServer>;

/// An `HmrServer` wired to fakes, plus handles to drive them.
pub struct Harness {
    pub server: TestServer,
    pub watcher: FakeWatcher,
    pub connections: FakeConnectionServer,
    pub fs: MockFileSystem,
}

impl Harness {
    /// A stopped server watching `/project`.
    pub fn new(defaults: EffectiveSettings) -> Self {
        init_tracing();

        let watcher = FakeWatcher::new();
        let connections = FakeConnectionServer::new();
        let fs = MockFileSystem::new();
        let server = HmrServer::new(
            watcher.clone(),
            connections.clone(),
            vec![PROJECT.into()],
            defaults,
        )
        .with_file_system(Arc::new(fs.clone()));

        Self {
            server,
            watcher,
            connections,
            fs,
        }
    }

    pub fn running(defaults: EffectiveSettings) -> Self {
        let mut harness = Self::new(defaults);
        harness.server.run().expect("server should start");
        harness
    }

    /// Connect a client and wait until the server has registered it.
    ///
    /// Registration is confirmed with an empty settings request, whose
    /// acknowledgement is consumed here.
    pub async fn connect(&self) -> FakeClient {
        let mut client = self
            .connections
            .connect()
            .expect("server should accept connections");
        client.send(r#"{"event":"settings"}"#);
        let ack = client.recv_json().await;
        assert_eq!(ack["event"], "settings");
        client
    }

    pub fn emit(&self, kind: WatchEventKind, path: &str) {
        assert_eq!(self.watcher.emit(kind, path), 1, "server should be listening");
    }
}

pub fn defaults() -> EffectiveSettings {
    EffectiveSettings::new(PROJECT)
}
