//! Sensor readings and their on-disk line format.
//!
//! A [`Reading`] is produced by the [`LineParser`] from one line of serial input and
//! consumed immediately by the [`crate::data::Aggregator`]. Every log file stores
//! readings as `"<unix_seconds> <value>\n"` lines.

pub mod parser;
pub mod reading;

pub use parser::LineParser;
pub use reading::Reading;

/// Current wall-clock time as unix seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Human-readable local time for log messages.
pub fn format_timestamp(unix_secs: i64) -> String {
    match chrono::DateTime::from_timestamp(unix_secs, 0) {
        Some(utc) => utc
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
        None => unix_secs.to_string(),
    }
}
