//! Sensor transports.
//!
//! The ingestion loop consumes text lines through the [`LineSource`] trait:
//!
//! - [`SerialLineSource`] - a physical or virtual serial device (feature `instrument_serial`)
//! - [`SimulatedSensor`] - synthetic temperatures for running without hardware
//! - [`ScriptedSource`] - a fixed list of lines, for tests
//!
//! [`open_source`] picks one from the configured device name.

pub mod mock;
pub mod serial;

pub use mock::{ScriptedSource, SimulatedSensor};
pub use serial::{LineAssembler, SerialLineSource};

use crate::config::SerialConfig;
use crate::error::{Result, TemplogError};
use std::time::Duration;

/// Device name that selects the [`SimulatedSensor`].
pub const MOCK_DEVICE: &str = "mock";

/// A blocking producer of newline-delimited text.
pub trait LineSource: Send {
    /// Read the next complete line, without its terminator.
    ///
    /// Returns `Ok(None)` when the read timeout expired with no complete line;
    /// that is not an error and the caller simply reads again.
    fn read_line(&mut self) -> Result<Option<String>>;

    /// Change the read timeout.
    fn set_timeout(&mut self, timeout: Duration) -> Result<()>;

    /// Human-readable identifier for logs.
    fn name(&self) -> &str;
}

impl<S: LineSource + ?Sized> LineSource for Box<S> {
    fn read_line(&mut self) -> Result<Option<String>> {
        (**self).read_line()
    }

    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        (**self).set_timeout(timeout)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Supported serial speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaudRate {
    /// 4800 baud
    B4800,
    /// 9600 baud
    B9600,
    /// 19200 baud
    B19200,
    /// 38400 baud
    B38400,
    /// 57600 baud
    B57600,
    /// 115200 baud
    B115200,
}

impl BaudRate {
    /// Numeric rate passed to the port
    pub fn as_u32(self) -> u32 {
        match self {
            BaudRate::B4800 => 4800,
            BaudRate::B9600 => 9600,
            BaudRate::B19200 => 19_200,
            BaudRate::B38400 => 38_400,
            BaudRate::B57600 => 57_600,
            BaudRate::B115200 => 115_200,
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = TemplogError;

    fn try_from(value: u32) -> Result<Self> {
        match value {
            4800 => Ok(BaudRate::B4800),
            9600 => Ok(BaudRate::B9600),
            19_200 => Ok(BaudRate::B19200),
            38_400 => Ok(BaudRate::B38400),
            57_600 => Ok(BaudRate::B57600),
            115_200 => Ok(BaudRate::B115200),
            other => Err(TemplogError::Configuration(format!(
                "Unsupported baud rate {other}. Must be one of: 4800, 9600, 19200, 38400, 57600, 115200"
            ))),
        }
    }
}

/// Open the line source named by `config.device`.
pub fn open_source(config: &SerialConfig) -> Result<Box<dyn LineSource>> {
    let timeout = Duration::from_millis(config.timeout_ms);
    if config.device.eq_ignore_ascii_case(MOCK_DEVICE) {
        return Ok(Box::new(SimulatedSensor::new(config.marker)));
    }

    let baud_rate = BaudRate::try_from(config.baud_rate)?;
    let mut source = SerialLineSource::open(&config.device, baud_rate)?;
    source.set_timeout(timeout)?;
    Ok(Box::new(source))
}
