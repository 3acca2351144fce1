// crates/test-utils/src/lib.rs

//! Shared helpers for tagforge's integration tests: a recording dashboard,
//! closure-based stub actions and factories, and mock source-tree fixtures.

pub mod actions;
pub mod dashboard;
pub mod fixtures;

/// Initialise tracing for tests. Safe to call from every test; only the
/// first call installs a subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
