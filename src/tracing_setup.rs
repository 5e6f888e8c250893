//! Tracing initialization for embedding applications
//!
//! The library itself only emits through `tracing` macros; wiring a
//! subscriber is the host application's job. This helper covers the
//! common case: console output filtered by `RUST_LOG` (default `info`).

use tracing_subscriber::EnvFilter;

/// Initialize console tracing with a RUST_LOG-driven filter
///
/// Safe to call more than once; subsequent calls are no-ops so tests can
/// initialize independently.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init();
}
