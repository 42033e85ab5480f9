pub mod builders;
pub mod fake_executor;

use std::sync::Once;
use std::time::Duration;

use dagflow::{AppHandle, Outcome};
use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Block on a handle's result with an upper bound, so a scheduling bug fails
/// the test instead of hanging it.
pub fn result_within(handle: &AppHandle, timeout: Duration) -> Outcome {
    let (tx, rx) = std::sync::mpsc::channel();
    let waited = handle.clone();
    std::thread::spawn(move || {
        let _ = tx.send(waited.result());
    });
    rx.recv_timeout(timeout)
        .expect("handle did not settle within the timeout")
}
