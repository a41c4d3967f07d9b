//! Shared helpers for integration tests.

#![allow(dead_code)]
#![allow(unused_macros)]

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a test-writer tracing subscriber once per process.
///
/// Honors `RUST_LOG`; defaults to `saslwrap=trace` so failing tests show the
/// wrap/unwrap events leading up to the failure.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("saslwrap=trace"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Marks the start of a test phase in the log.
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "==== test phase ====");
    };
}

/// Asserts a condition, logging expected and actual values first.
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {{
        let expected = &$expected;
        let actual = &$actual;
        tracing::debug!(expected = ?expected, actual = ?actual, "{}", $msg);
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, expected, actual);
    }};
}

/// Marks a test as complete in the log.
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test complete");
    };
}

/// A 16-byte shared secret with a recognizable pattern.
pub fn secret() -> saslwrap::SharedSecret {
    saslwrap::SharedSecret::new((0x30u8..0x40).collect::<Vec<_>>())
}
