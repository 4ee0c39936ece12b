#![forbid(unsafe_code)]

//! Tracing bootstrap.
//!
//! Library code only emits `tracing` events; hosts that want them on stderr
//! call [`init_tracing`] once at startup. The filter is read from
//! `FLOATPANE_LOG`, then `RUST_LOG`, then the supplied default directive.
//! With the `tracing-json` feature the formatter emits one JSON object per
//! event.

pub use tracing::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_ENV: &str = "FLOATPANE_LOG";

/// Default filter when neither environment variable is set.
pub const DEFAULT_DIRECTIVE: &str = "warn";

/// Build the env filter used by [`init_tracing`].
#[must_use]
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Install the global subscriber.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = env_filter(default_directive);

    #[cfg(feature = "tracing-json")]
    let layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(true)
        .with_writer(std::io::stderr);
    #[cfg(not(feature = "tracing-json"))]
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .is_ok()
}
