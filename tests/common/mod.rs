//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Once;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Ensures tracing is only initialized once across all tests.
static INIT: Once = Once::new();

/// Install a console subscriber filtered by `RUST_LOG` (default `warn`).
///
/// Safe to call multiple times; only the first call takes effect.
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(make_filter(Level::WARN))
            .with_thread_ids(true)
            .with_target(true)
            .with_test_writer()
            .try_init();
    });
}

fn make_filter(default_level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("{default_level}")))
}

/// Key for thread `t`, item `i`. Threads share a long common prefix so
/// their inserts meet in the same inner nodes.
pub fn thread_key(t: usize, i: usize) -> Vec<u8> {
    format!("shared/prefix/{:02}/{:06}", i % 64, t * 1_000_000 + i).into_bytes()
}
