//! Configuration system using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Built-in defaults ([`Settings::default`])
//! 2. `config/templog.toml` (optional)
//! 3. Environment variables prefixed with `TEMPLOG_`, nested keys separated by `__`
//!    (e.g. `TEMPLOG_SERVER__PORT=9000`)
//! 4. Positional command line arguments, applied with [`Settings::with_overrides`]
//!
//! # Example
//! ```no_run
//! use templog::config::Settings;
//!
//! let settings = Settings::load()?;
//! settings.validate()?;
//! println!("Serving on {}", settings.server.bind_addr());
//! # Ok::<(), templog::error::TemplogError>(())
//! ```

use crate::error::{Result, TemplogError};
use crate::hardware::BaudRate;
use crate::logging::{parse_log_level, parse_output_format};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default location of the TOML configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/templog.toml";

const HOUR_SECS: i64 = 3600;
const DAY_SECS: i64 = HOUR_SECS * 24;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Application settings
    pub application: ApplicationConfig,
    /// Serial device settings
    pub serial: SerialConfig,
    /// Log file locations and retention
    pub storage: StorageConfig,
    /// Rollup windows
    pub aggregation: AggregationConfig,
    /// HTTP frontend settings
    pub server: ServerConfig,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationConfig {
    /// Application name
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log output format (pretty, compact, json)
    pub log_format: String,
}

/// Serial device configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialConfig {
    /// Device name (e.g. "/dev/ttyUSB0", "COM4"), or "mock" for the simulated sensor
    pub device: String,
    /// Baud rate, one of 4800, 9600, 19200, 38400, 57600, 115200
    pub baud_rate: u32,
    /// Read timeout in milliseconds
    pub timeout_ms: u64,
    /// Marker character the device wraps each value in
    pub marker: char,
}

/// Log file configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// Directory holding the three log files
    pub log_dir: PathBuf,
    /// File name of the raw reading log
    pub raw_file: String,
    /// File name of the hourly mean log
    pub hourly_file: String,
    /// File name of the daily mean log
    pub daily_file: String,
    /// Maximum age of raw readings, enforced at each hourly rollup
    pub raw_retention_secs: i64,
    /// Maximum age of hourly means
    pub hourly_retention_secs: i64,
    /// Maximum age of daily means
    pub daily_retention_secs: i64,
}

/// Rollup window configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregationConfig {
    /// Seconds between hourly rollups, also the width of the averaging window
    pub hour_window_secs: i64,
    /// Seconds between daily rollups, also the width of the averaging window
    pub day_window_secs: i64,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// How long to wait for the first request bytes before dropping the client
    pub read_wait_ms: u64,
    /// How long a client may take to accept the response before it is dropped
    pub write_wait_ms: u64,
    /// Size of the receive buffer; a read shorter than this ends the request
    pub read_buffer_size: usize,
    /// Directories searched for static files, in order
    pub static_dirs: Vec<PathBuf>,
    /// Per-extension search directories overriding `static_dirs` (key without the dot)
    pub extension_dirs: BTreeMap<String, Vec<PathBuf>>,
    /// File served for directory-like paths
    pub index_file: String,
}

impl ServerConfig {
    /// `host:port` string passed to the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            application: ApplicationConfig {
                name: "templog".to_string(),
                log_level: "info".to_string(),
                log_format: "pretty".to_string(),
            },
            serial: SerialConfig {
                device: "COM4".to_string(),
                baud_rate: 115_200,
                timeout_ms: 1000,
                marker: '$',
            },
            storage: StorageConfig {
                log_dir: PathBuf::from("logs"),
                raw_file: "temperature_log_all.log".to_string(),
                hourly_file: "temperature_log_hourly.log".to_string(),
                daily_file: "temperature_log_daily.log".to_string(),
                raw_retention_secs: DAY_SECS,
                hourly_retention_secs: DAY_SECS * 30,
                daily_retention_secs: DAY_SECS * 365,
            },
            aggregation: AggregationConfig {
                hour_window_secs: HOUR_SECS,
                day_window_secs: DAY_SECS,
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                read_wait_ms: 50,
                write_wait_ms: 5000,
                read_buffer_size: 1024,
                static_dirs: default_search_dirs("html"),
                extension_dirs: BTreeMap::from([("js".to_string(), default_search_dirs("js"))]),
                index_file: "temperature.html".to_string(),
            },
        }
    }
}

fn default_search_dirs(content_dir: &str) -> Vec<PathBuf> {
    vec![
        Path::new("..").join(content_dir),
        Path::new(".").join(content_dir),
        PathBuf::from(".."),
        PathBuf::from("."),
    ]
}

impl Settings {
    /// Load configuration from `config/templog.toml` and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific file path. A missing file is not an error.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("TEMPLOG_").split("__"))
            .extract()?;
        Ok(settings)
    }

    /// Apply the positional command line arguments.
    pub fn with_overrides(
        mut self,
        device: Option<String>,
        host: Option<String>,
        port: Option<u16>,
    ) -> Self {
        if let Some(device) = device {
            self.serial.device = device;
        }
        if let Some(host) = host {
            self.server.host = host;
        }
        if let Some(port) = port {
            self.server.port = port;
        }
        self
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<()> {
        parse_log_level(&self.application.log_level).map_err(TemplogError::Configuration)?;
        parse_output_format(&self.application.log_format).map_err(TemplogError::Configuration)?;

        BaudRate::try_from(self.serial.baud_rate)?;

        let positive = [
            ("storage.raw_retention_secs", self.storage.raw_retention_secs),
            ("storage.hourly_retention_secs", self.storage.hourly_retention_secs),
            ("storage.daily_retention_secs", self.storage.daily_retention_secs),
            ("aggregation.hour_window_secs", self.aggregation.hour_window_secs),
            ("aggregation.day_window_secs", self.aggregation.day_window_secs),
        ];
        for (key, value) in positive {
            if value <= 0 {
                return Err(TemplogError::Configuration(format!(
                    "{key} must be positive, got {value}"
                )));
            }
        }

        if self.server.read_buffer_size == 0 {
            return Err(TemplogError::Configuration(
                "server.read_buffer_size must be at least 1".to_string(),
            ));
        }

        let names = [
            &self.storage.raw_file,
            &self.storage.hourly_file,
            &self.storage.daily_file,
        ];
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(TemplogError::Configuration(
                "log file names must not be empty".to_string(),
            ));
        }
        if names[0] == names[1] || names[0] == names[2] || names[1] == names[2] {
            return Err(TemplogError::Configuration(format!(
                "log file names must be distinct: {}, {}, {}",
                names[0], names[1], names[2]
            )));
        }

        Ok(())
    }
}
