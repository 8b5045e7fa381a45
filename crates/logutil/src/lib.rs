//! Shared `tracing` setup for binaries built on top of `graph_core`.

use tracing_subscriber::EnvFilter;

/// Install a `tracing` subscriber that reads its filter from `RUST_LOG`,
/// defaulting to `info` when unset.
///
/// Intended to be called once, near the top of `main`.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Same as [`init_logging`] but emits newline-delimited JSON, for when a
/// binary's output is consumed by another program instead of a terminal.
pub fn init_json_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
