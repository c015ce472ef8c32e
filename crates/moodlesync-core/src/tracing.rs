//! Logging setup shared by the moodlesync crates.
//!
//! A sync run is a one-shot process, usually started by hand or by an
//! external scheduler. Interactive runs want compact human output; scheduled
//! runs usually want JSON lines that a log collector can ingest.
//!
//! ```ignore
//! use moodlesync_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::scheduled())?;
//! ```

use std::str::FromStr;

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Crate targets that receive the configured default level.
const CRATE_TARGETS: [&str; 4] = [
    "moodlesync_core",
    "moodlesync_providers",
    "moodlesync_engine",
    "moodlesync_cli",
];

/// Errors that can occur during tracing initialization
#[derive(Debug, Error)]
pub enum TracingError {
    /// Failed to set global subscriber
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// Failed to parse env filter directive
    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),

    /// Unknown output format name
    #[error("unknown log format `{0}` (expected pretty, compact or json)")]
    UnknownFormat(String),
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line human-readable output
    Pretty,
    /// Single-line human-readable output (default)
    #[default]
    Compact,
    /// JSON lines
    Json,
}

impl FromStr for TracingOutputFormat {
    type Err = TracingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(TracingError::UnknownFormat(other.to_string())),
        }
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Level applied to the moodlesync crates when `RUST_LOG` is unset
    pub default_level: Level,
    /// Output format for log lines
    pub output_format: TracingOutputFormat,
    /// Whether to include file/line information
    pub include_location: bool,
    /// Whether to include the module path
    pub include_target: bool,
    /// Custom env filter directive (overrides `default_level` and `RUST_LOG`)
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Compact,
            include_location: false,
            include_target: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// Verbose settings for `--debug` runs.
    #[must_use]
    pub fn cli_debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            include_location: true,
            include_target: true,
            ..Self::default()
        }
    }

    /// JSON output for runs started by an external scheduler.
    #[must_use]
    pub fn scheduled() -> Self {
        Self {
            output_format: TracingOutputFormat::Json,
            include_target: true,
            ..Self::default()
        }
    }

    /// Set the default log level
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Set the output format
    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    /// Set a custom env filter directive
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Builds the default filter directive for the moodlesync crates.
    pub fn default_directive(&self) -> String {
        let level = self.default_level.to_string().to_lowercase();
        CRATE_TARGETS
            .iter()
            .map(|target| format!("{target}={level}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Initialize tracing with the given configuration.
///
/// Call once at process start. `RUST_LOG` overrides the default level
/// unless an explicit filter is configured.
///
/// # Errors
///
/// Returns an error if a global subscriber is already set or if the
/// filter directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let env_filter = match config.env_filter {
        Some(ref filter) => EnvFilter::try_new(filter)?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(config.default_directive()))?,
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.output_format {
        TracingOutputFormat::Pretty => {
            let layer = fmt::layer()
                .pretty()
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target)
                .with_writer(std::io::stderr);
            tracing::subscriber::set_global_default(registry.with(layer))?;
        }
        TracingOutputFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target)
                .with_writer(std::io::stderr);
            tracing::subscriber::set_global_default(registry.with(layer))?;
        }
        TracingOutputFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_file(config.include_location)
                .with_line_number(config.include_location)
                .with_target(config.include_target)
                .with_writer(std::io::stderr);
            tracing::subscriber::set_global_default(registry.with(layer))?;
        }
    }

    Ok(())
}
