//! Tracing and logging setup
//!
//! Configures the `tracing` subscriber with environment-based filtering.
//! Libraries only emit; binaries and tests call [`init_tracing`] once.

use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Tracing configuration options
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level filter when RUST_LOG is unset
    pub level: Level,
    /// Enable JSON output format
    pub json: bool,
    /// Include file and line numbers
    pub file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json: false,
            file_line: false,
        }
    }
}

impl TracingConfig {
    /// Verbose configuration for local debugging
    #[must_use]
    pub fn debug() -> Self {
        Self {
            level: Level::DEBUG,
            json: false,
            file_line: true,
        }
    }
}

/// Initialize the global tracing subscriber
///
/// RUST_LOG takes precedence over the configured level. Calling this twice
/// returns an error from the subscriber registry; ignore it in tests.
pub fn init_tracing(config: &TracingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_string()));

    let fmt_layer = fmt::layer()
        .with_file(config.file_line)
        .with_line_number(config.file_line);

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}
