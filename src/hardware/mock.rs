//! Mock Line Sources
//!
//! Simulated sensors for running and testing without physical hardware.
//!
//! # Available Mocks
//!
//! - `SimulatedSensor` - Outdoor temperature with a seasonal curve and a daily profile
//! - `ScriptedSource` - Replays a fixed list of lines and errors

use super::{LineSource, MOCK_DEVICE};
use crate::error::{Result, TemplogError};
use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Timelike};
use rand::Rng;
use std::collections::VecDeque;
use std::time::Duration;

/// Mean temperature at the start of each month, January first.
const MONTH_START_TEMPS: [f64; 12] = [
    -11.6, -7.6, -1.0, 6.0, 10.7, 14.5, 18.8, 20.6, 16.7, 9.6, -0.1, -8.8,
];

/// Amplitude of the uniform noise added to each simulated reading.
const NOISE: f64 = 0.2;

/// Seasonal component: linear interpolation between the start of this month and the next.
pub fn seasonal_temperature<Tz: TimeZone>(at: &DateTime<Tz>) -> f64 {
    let month = at.month0() as usize;
    let progress = at.day0() as f64 / days_in_month(at.year(), at.month()) as f64;
    let start = MONTH_START_TEMPS[month];
    let end = MONTH_START_TEMPS[(month + 1) % 12];
    start * (1.0 - progress) + end * progress
}

/// Daily component for a time of day given as a fraction in `[0, 1)`.
///
/// Coldest just before dawn (-6), warmest at noon (+8).
pub fn daily_offset(day_fraction: f64) -> f64 {
    let quarter = day_fraction * 4.0;
    if day_fraction < 0.25 {
        -4.0 - 2.0 * quarter
    } else if day_fraction < 0.5 {
        -6.0 + 14.0 * (quarter - 1.0)
    } else if day_fraction < 0.75 {
        8.0 - 4.0 * (quarter - 2.0)
    } else {
        4.0 - 8.0 * (quarter - 3.0)
    }
}

/// Seasonal plus daily temperature at `at`, without noise.
pub fn model_temperature<Tz: TimeZone>(at: &DateTime<Tz>) -> f64 {
    let seconds = at.num_seconds_from_midnight() as f64;
    seasonal_temperature(at) + daily_offset(seconds / 86_400.0)
}

fn days_in_month(year: i32, month: u32) -> i64 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    match (
        NaiveDate::from_ymd_opt(year, month, 1),
        NaiveDate::from_ymd_opt(next_year, next_month, 1),
    ) {
        (Some(first), Some(next)) => next.signed_duration_since(first).num_days(),
        _ => 30,
    }
}

/// Temperature sensor driven by [`model_temperature`] with small random noise.
///
/// Emits one marker-wrapped line (`$21.37$`) per period, like the real device.
pub struct SimulatedSensor {
    marker: char,
    period: Duration,
}

impl SimulatedSensor {
    /// One reading per second with ±0.2 degrees of noise.
    pub fn new(marker: char) -> Self {
        Self {
            marker,
            period: Duration::from_secs(1),
        }
    }

    /// Set the delay between readings
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    fn sample(&self) -> f64 {
        model_temperature(&Local::now()) + rand::thread_rng().gen_range(-NOISE..NOISE)
    }
}

impl LineSource for SimulatedSensor {
    fn read_line(&mut self) -> Result<Option<String>> {
        if !self.period.is_zero() {
            std::thread::sleep(self.period);
        }
        let m = self.marker;
        Ok(Some(format!("{m}{:.2}{m}", self.sample())))
    }

    fn set_timeout(&mut self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        MOCK_DEVICE
    }
}

enum ScriptStep {
    Line(String),
    Failure(TemplogError),
}

/// Replays scripted lines, then reports timeouts forever.
#[derive(Default)]
pub struct ScriptedSource {
    steps: VecDeque<ScriptStep>,
}

impl ScriptedSource {
    /// Replay `lines` in order
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: lines.into_iter().map(|l| ScriptStep::Line(l.into())).collect(),
        }
    }

    /// Queue a line
    pub fn with_line(mut self, line: impl Into<String>) -> Self {
        self.steps.push_back(ScriptStep::Line(line.into()));
        self
    }

    /// Queue a serial read failure
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.with_failure(TemplogError::Serial(message.into()))
    }

    /// Queue an arbitrary read failure
    pub fn with_failure(mut self, error: TemplogError) -> Self {
        self.steps.push_back(ScriptStep::Failure(error));
        self
    }

    /// Steps not yet replayed
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl LineSource for ScriptedSource {
    fn read_line(&mut self) -> Result<Option<String>> {
        match self.steps.pop_front() {
            Some(ScriptStep::Line(line)) => Ok(Some(line)),
            Some(ScriptStep::Failure(error)) => Err(error),
            None => Ok(None),
        }
    }

    fn set_timeout(&mut self, _timeout: Duration) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
