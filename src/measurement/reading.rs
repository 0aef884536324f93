//! The timestamped sample and its log line form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One timestamped scalar sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Unix seconds
    pub timestamp: i64,
    /// Degrees Celsius
    pub value: f64,
}

impl Reading {
    /// Reading taken at `timestamp`
    pub fn new(timestamp: i64, value: f64) -> Self {
        Self { timestamp, value }
    }

    /// Serialize as a newline-terminated log line.
    pub fn to_log_line(&self) -> String {
        format!("{self}\n")
    }

    /// Parse a stored log line. Returns `None` for anything that is not
    /// `<integer> <float>`, which callers treat as a line to skip.
    pub fn from_log_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let timestamp = fields.next()?.parse::<i64>().ok()?;
        let value = fields.next()?.parse::<f64>().ok()?;
        Some(Self { timestamp, value })
    }

    /// Seconds elapsed between this reading and `now`.
    pub fn age(&self, now: i64) -> i64 {
        now.saturating_sub(self.timestamp)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.timestamp, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_format() {
        assert_eq!(Reading::new(100, 23.5).to_log_line(), "100 23.5\n");
        assert_eq!(Reading::new(1_700_000_000, -4.0).to_log_line(), "1700000000 -4\n");
    }

    #[test]
    fn test_from_log_line() {
        assert_eq!(
            Reading::from_log_line("100 23.5"),
            Some(Reading::new(100, 23.5))
        );
        // Lines written by other tools may carry a trailing CR or extra precision
        assert_eq!(
            Reading::from_log_line("1700000000 -6.12345\r"),
            Some(Reading::new(1_700_000_000, -6.12345))
        );
    }

    #[test]
    fn test_malformed_log_lines() {
        assert_eq!(Reading::from_log_line(""), None);
        assert_eq!(Reading::from_log_line("100"), None);
        assert_eq!(Reading::from_log_line("abc 1.0"), None);
        assert_eq!(Reading::from_log_line("100 N/A"), None);
    }

    #[test]
    fn test_age() {
        let reading = Reading::new(100, 1.0);
        assert_eq!(reading.age(160), 60);
        assert_eq!(reading.age(90), -10);
    }
}
