// crates/test-utils/src/lib.rs

//! Shared fixtures for assetflow's integration tests: temp projects and
//! config builders in [`builders`], recording fakes in [`fakes`].

pub mod builders;
pub mod fakes;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use assetflow::logging::LOG_ENV;
use tracing_subscriber::{EnvFilter, fmt};

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static INIT: Once = Once::new();

/// Route `tracing` output into the test harness.
///
/// The filter comes from `ASSETFLOW_LOG` (same variable as the binary),
/// e.g. `ASSETFLOW_LOG=assetflow::engine=debug`, and defaults to `warn` so
/// per-file reporter noise stays out of passing runs.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test after [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test step did not finish within {TEST_TIMEOUT:?}"))
}

/// Poll `condition` until it holds, failing the test after [`TEST_TIMEOUT`].
///
/// For outcomes driven by real filesystem events, whose latency varies.
pub async fn eventually(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + TEST_TIMEOUT;
    while !condition() {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
