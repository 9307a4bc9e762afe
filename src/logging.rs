//! Logging setup
//!
//! Installs the global tracing subscriber used by the binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line output
    #[default]
    Plain,
    /// One JSON object per event
    Json,
}

/// Build the event filter from `RUST_LOG`, falling back to `log_level`
pub fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
}

/// Initialize the tracing subscriber with the specified log level.
///
/// Logs go to stderr so that command output on stdout stays parseable.
pub fn init_tracing(log_level: &str, format: LogFormat) {
    let filter = build_filter(log_level);

    let layer = match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_filter(filter)
            .boxed(),
        LogFormat::Plain => fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter)
            .boxed(),
    };

    // A subscriber may already be installed (tests, embedding applications)
    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        tracing::debug!("Tracing subscriber already initialized");
    }
}
