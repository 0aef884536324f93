//! Custom error types for the application.
//!
//! This module defines the primary error type, `TemplogError`, for the whole crate.
//! Using the `thiserror` crate, it gives one place to classify the failures that the
//! ingestion and serving loops run into.
//!
//! ## Error Hierarchy
//!
//! - **`Parse`**: A malformed sensor line. The ingestion loop skips the line and keeps going.
//! - **`Io`**: Wraps `std::io::Error` for log file open/read/write failures. The failed
//!   operation is logged and retried on the next cycle.
//! - **`Socket`**: Bind/listen failure of the HTTP server. Fatal for the serving loop only.
//! - **`Serial`**: The serial device could not be opened or read.
//! - **`NotFound`**: Route or static file resolution miss. Always rendered as a 404 page.
//! - **`MalformedRequest`**: The request line could not be split into method, path and version.
//! - **`Config`** / **`Configuration`**: Loading and semantic validation of [`crate::config::Settings`].
//!
//! By using `#[from]`, `TemplogError` can be created from the underlying error types
//! with the `?` operator.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type Result<T> = std::result::Result<T, TemplogError>;

/// Every failure the crate reports.
#[derive(Error, Debug)]
pub enum TemplogError {
    /// A sensor line that is not a number
    #[error("Could not parse sensor line {line:?}")]
    Parse {
        /// The line as received
        line: String,
    },

    /// Log file or socket I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The HTTP listener could not be bound
    #[error("Failed to listen on {addr}: {source}")]
    Socket {
        /// Address that was requested
        addr: String,
        /// Bind error from the OS
        #[source]
        source: std::io::Error,
    },

    /// The serial device could not be opened or read
    #[error("Serial port error: {0}")]
    Serial(String),

    /// A serial device was configured in a build without serial support
    #[error("Serial support not enabled. Rebuild with --features instrument_serial")]
    SerialFeatureDisabled,

    /// No route or static file for the path
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request line did not have three parts
    #[error("Malformed HTTP request: {0}")]
    MalformedRequest(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration loaded but failed validation
    #[error("Configuration validation error: {0}")]
    Configuration(String),
}

impl From<figment::Error> for TemplogError {
    fn from(value: figment::Error) -> Self {
        TemplogError::Config(Box::new(value))
    }
}

impl TemplogError {
    /// Whether the loop that hit this error can keep running.
    ///
    /// Only listener and configuration failures stop a loop; everything else
    /// is scoped to a single reading or a single connection.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            TemplogError::Socket { .. }
                | TemplogError::Config(_)
                | TemplogError::Configuration(_)
                | TemplogError::SerialFeatureDisabled
        )
    }
}
