//! Diagnostics bootstrap
//!
//! The crate reports its own internal conditions (storage failures, dropped
//! broadcasts, reentrancy cut-offs) through `tracing`. Applications that do not
//! install a subscriber of their own can call [`init_tracing`].

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "fanlog=info";

/// Build the filter from `RUST_LOG`, falling back to `default_filter`
pub fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install a global stderr subscriber
///
/// Fails if a global subscriber is already set.
pub fn try_init_tracing(default_filter: &str) -> Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter(default_filter))
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")
}

/// Install a global stderr subscriber, ignoring an already installed one
pub fn init_tracing(default_filter: &str) {
    if let Err(e) = try_init_tracing(default_filter) {
        tracing::debug!(error = %e, "Tracing already initialized");
    }
}
