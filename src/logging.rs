//! Tracing setup
//!
//! Both loops log through `tracing`. The subscriber is installed once at startup from
//! `application.log_level` and `application.log_format`; a `RUST_LOG` filter in the
//! environment takes precedence over the configured level.
//!
//! # Example
//! ```no_run
//! use templog::{config::Settings, logging};
//! use tracing::info;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load()?;
//! logging::init_from_settings(&settings)?;
//! info!(device = %settings.serial.device, "Logger started");
//! # Ok(())
//! # }
//! ```

use crate::config::Settings;
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

/// How log events are rendered on stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Multi-line, colored; for a terminal
    Pretty,
    /// One line per event, no colors; for a service log
    Compact,
    /// One JSON object per event
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(OutputFormat::Pretty),
            "compact" => Ok(OutputFormat::Compact),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!(
                "Invalid log format '{s}'. Must be one of: pretty, compact, json"
            )),
        }
    }
}

/// Subscriber settings derived from `[application]`.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Most verbose level emitted when `RUST_LOG` is unset
    pub level: Level,
    /// Event rendering
    pub format: OutputFormat,
    /// ANSI colors, honoured by the pretty format only
    pub ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: OutputFormat::Pretty,
            ansi: true,
        }
    }
}

impl TracingConfig {
    /// Parse level and format from `settings.application`.
    pub fn from_settings(settings: &Settings) -> Result<Self, String> {
        Ok(Self {
            level: parse_log_level(&settings.application.log_level)?,
            format: parse_output_format(&settings.application.log_format)?,
            ..Self::default()
        })
    }

    /// Set the output format
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Enable or disable ANSI colors
    pub fn with_ansi(mut self, ansi: bool) -> Self {
        self.ansi = ansi;
        self
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_ascii_lowercase()))
    }

    fn layer(&self) -> Box<dyn Layer<Registry> + Send + Sync> {
        let base = fmt::layer().with_thread_names(true).with_target(true);
        match self.format {
            OutputFormat::Pretty => base.pretty().with_ansi(self.ansi).boxed(),
            OutputFormat::Compact => base.compact().with_ansi(false).boxed(),
            OutputFormat::Json => base.json().with_ansi(false).boxed(),
        }
    }
}

/// Install the global subscriber described by `settings.application`.
pub fn init_from_settings(settings: &Settings) -> Result<(), String> {
    init(TracingConfig::from_settings(settings)?)
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(config: TracingConfig) -> Result<(), String> {
    if tracing::dispatcher::has_been_set() {
        return Ok(());
    }

    tracing_subscriber::registry()
        .with(config.layer().with_filter(config.filter()))
        .try_init()
        .map_err(|e| format!("Failed to initialize tracing: {e}"))
}

/// Level names are case-insensitive (`info`, `WARN`).
pub fn parse_log_level(level: &str) -> Result<Level, String> {
    Level::from_str(level).map_err(|_| {
        format!("Invalid log level '{level}'. Must be one of: trace, debug, info, warn, error")
    })
}

/// Format names are case-insensitive (`pretty`, `Compact`, `JSON`).
pub fn parse_output_format(format: &str) -> Result<OutputFormat, String> {
    format.parse()
}
