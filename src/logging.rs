// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. the `DAGFLOW_LOG` environment variable (full `EnvFilter` syntax)
//! 2. the `default_level` argument (if provided)
//! 3. `info`

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialise the global logging subscriber.
///
/// Safe to call once at startup; a second call panics, so libraries
/// embedding a kernel should leave this to the application.
pub fn init_logging(default_level: Option<Level>) {
    let fallback = default_level.unwrap_or(Level::INFO);
    let filter = EnvFilter::try_from_env("DAGFLOW_LOG")
        .unwrap_or_else(|_| EnvFilter::new(fallback.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();
}
