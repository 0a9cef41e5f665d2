//! Logging and tracing setup for binir.
//!
//! The library itself only emits `tracing` events; binaries and tests pick a
//! subscriber with one of the `init_*` functions below.

use std::sync::Once;
#[allow(unused_imports)]
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

fn env_filter(default_filter: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter))
}

fn install(config: &LoggingConfig) {
    let filter = env_filter(&config.default_filter);
    // try_init: another subscriber may already be installed by the host.
    let installed = if config.json {
        let fmt_layer = fmt::layer()
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_current_span(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
    } else {
        let fmt_layer = fmt::layer()
            .with_span_events(FmtSpan::CLOSE)
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
    };
    if installed.is_ok() {
        info!(json = config.json, "binir tracing initialized");
    }
}

/// Initialize the global tracing subscriber.
///
/// Only the first `init_*` call in a process has any effect.
pub fn init_tracing() {
    init_tracing_with(&LoggingConfig::default());
}

/// Initialize tracing with JSON output for structured logging.
pub fn init_tracing_json() {
    init_tracing_with(&LoggingConfig {
        json: true,
        ..LoggingConfig::default()
    });
}

/// Initialize tracing from a [`LoggingConfig`].
pub fn init_tracing_with(config: &LoggingConfig) {
    INIT.call_once(|| install(config));
}

/// Macro for creating spans around IR operations
#[macro_export]
macro_rules! span_trace {
    ($name:expr) => {
        tracing::info_span!($name)
    };
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}

/// Macro for logging and returning errors
#[macro_export]
macro_rules! log_error {
    ($err:expr) => {{
        let e = $err;
        tracing::error!(error = %e, "Operation failed");
        e
    }};
    ($err:expr, $msg:expr) => {{
        let e = $err;
        tracing::error!(error = %e, message = $msg, "Operation failed");
        e
    }};
}
