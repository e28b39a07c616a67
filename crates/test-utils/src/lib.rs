//! Fakes and helpers shared by the `watch-remotely` integration tests.

pub mod builders;
pub mod fakes;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

pub use fakes::{FakeClient, FakeConnectionServer, FakeWatcher};

/// How long a test waits for the server to answer, send or shut down.
pub const DEADLINE: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Route `watch-remotely` logs into the test output.
///
/// Captured per test and shown for failures; `WATCH_REMOTELY_LOG=debug`
/// (or `RUST_LOG`) raises the level.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env("WATCH_REMOTELY_LOG")
            .or_else(|_| EnvFilter::try_from_default_env())
            .unwrap_or_else(|_| EnvFilter::new("watch_remotely=info"));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `fut`, failing the test with `what` if it outlives [`DEADLINE`].
pub async fn within_deadline<F: Future>(what: &str, fut: F) -> F::Output {
    match tokio::time::timeout(DEADLINE, fut).await {
        Ok(out) => out,
        Err(_) => panic!("{what} did not finish within {DEADLINE:?}"),
    }
}
