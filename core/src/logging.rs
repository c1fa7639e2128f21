//! Subscriber setup for binaries and tests embedding the client.
//!
//! The client itself only emits `tracing` events (request attempts at
//! `debug`, exhausted retries at `warn`). Hosts that speak a protocol on
//! stdout, such as a Terraform provider, must keep logs on stderr, so every
//! helper here writes there.
//!
//! Filtering follows `RUST_LOG`, e.g. `RUST_LOG=localskills_core=debug` to see
//! each retry.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs the global subscriber at `info` unless `RUST_LOG` says otherwise.
///
/// # Panics
///
/// Panics if a global subscriber has already been set.
pub fn init_logging() {
    init_logging_with_default("info");
}

/// Like [`init_logging`] with a different fallback level.
pub fn init_logging_with_default(default_level: &str) {
    tracing_subscriber::registry()
        .with(env_filter(default_level))
        .with(stderr_layer())
        .init();
}

/// Returns `false` instead of panicking when a subscriber is already set.
pub fn try_init_logging() -> bool {
    tracing_subscriber::registry()
        .with(env_filter("info"))
        .with(stderr_layer())
        .try_init()
        .is_ok()
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
}
