//! Serial line to [`Reading`] conversion.

use super::{unix_now, Reading};
use crate::error::{Result, TemplogError};

/// Turns raw serial text into validated readings.
///
/// The sensor wraps each value in a marker character (`$23.5$\r\n`). Whitespace and
/// the marker are stripped from both ends before conversion.
#[derive(Debug, Clone, Copy)]
pub struct LineParser {
    marker: char,
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new('$')
    }
}

impl LineParser {
    /// Parser stripping `marker` from both ends of a line
    pub fn new(marker: char) -> Self {
        Self { marker }
    }

    /// Parse a line and stamp it with the current time.
    pub fn parse(&self, line: &str) -> Result<Reading> {
        self.parse_at(line, unix_now())
    }

    /// Parse a line and stamp it with `timestamp`.
    ///
    /// Empty input, non-numeric content and values that overflow to infinity
    /// are rejected with [`TemplogError::Parse`].
    pub fn parse_at(&self, line: &str, timestamp: i64) -> Result<Reading> {
        let marker = self.marker;
        let trimmed = line.trim_matches(|c: char| c.is_whitespace() || c == marker);

        match trimmed.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Reading::new(timestamp, value)),
            _ => Err(TemplogError::Parse {
                line: line.to_string(),
            }),
        }
    }
}
