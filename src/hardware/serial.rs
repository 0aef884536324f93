//! Serial port line source.
//!
//! Wraps the `serialport` crate. Reads block for at most the configured timeout; bytes
//! are collected by a [`LineAssembler`] until a newline arrives.

use super::{BaudRate, LineSource};
use crate::error::{Result, TemplogError};
use std::time::Duration;
use tracing::debug;

#[cfg(feature = "instrument_serial")]
use serialport::SerialPort;

/// Lines longer than this without a terminator are flushed as-is, so a device that
/// never sends `\n` cannot grow the buffer without bound.
const MAX_LINE_LEN: usize = 4096;

/// Splits a byte stream into lines.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8>,
}

impl LineAssembler {
    /// Empty assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer bytes read from the port
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Take the next complete line, dropping the `\n` (and a preceding `\r`).
    pub fn next_line(&mut self) -> Option<String> {
        let end = match self.buffer.iter().position(|&b| b == b'\n') {
            Some(pos) => pos,
            None if self.buffer.len() >= MAX_LINE_LEN => {
                let line = String::from_utf8_lossy(&self.buffer).into_owned();
                self.buffer.clear();
                return Some(line);
            }
            None => return None,
        };

        let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }

    /// Bytes buffered without a terminator yet
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Serial device delivering one reading per line.
pub struct SerialLineSource {
    name: String,
    #[cfg(feature = "instrument_serial")]
    port: Box<dyn SerialPort>,
    assembler: LineAssembler,
}

impl SerialLineSource {
    /// Open `device` at `baud_rate`, 8 data bits, no parity, one stop bit.
    #[cfg(feature = "instrument_serial")]
    pub fn open(device: &str, baud_rate: BaudRate) -> Result<Self> {
        let port = serialport::new(device, baud_rate.as_u32())
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(Duration::from_secs(1))
            .open()
            .map_err(|e| {
                TemplogError::Serial(format!(
                    "Failed to open serial port '{}' at {} baud: {}",
                    device,
                    baud_rate.as_u32(),
                    e
                ))
            })?;

        debug!(device, baud = baud_rate.as_u32(), "Serial port opened");
        Ok(Self {
            name: device.to_string(),
            port,
            assembler: LineAssembler::new(),
        })
    }

    /// Always fails: this build has no serial support.
    #[cfg(not(feature = "instrument_serial"))]
    pub fn open(_device: &str, _baud_rate: BaudRate) -> Result<Self> {
        Err(TemplogError::SerialFeatureDisabled)
    }
}

impl LineSource for SerialLineSource {
    #[cfg(feature = "instrument_serial")]
    fn read_line(&mut self) -> Result<Option<String>> {
        use std::io::{ErrorKind, Read};

        if let Some(line) = self.assembler.next_line() {
            return Ok(Some(line));
        }

        let mut buf = [0u8; 256];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(n) => {
                self.assembler.push(&buf[..n]);
                Ok(self.assembler.next_line())
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => Ok(None),
            Err(e) => Err(TemplogError::Serial(format!(
                "Read from '{}' failed: {}",
                self.name, e
            ))),
        }
    }

    #[cfg(not(feature = "instrument_serial"))]
    fn read_line(&mut self) -> Result<Option<String>> {
        Ok(self.assembler.next_line())
    }

    #[cfg(feature = "instrument_serial")]
    fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port
            .set_timeout(timeout)
            .map_err(|e| TemplogError::Serial(format!("Failed to set timeout: {e}")))
    }

    #[cfg(not(feature = "instrument_serial"))]
    fn set_timeout(&mut self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}
