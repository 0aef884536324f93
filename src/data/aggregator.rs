//! Hourly and daily rollups driven by incoming readings.
//!
//! Every reading is appended to the raw log. Two independent timers then decide whether a
//! rollup is due:
//!
//! ```text
//! reading ──► append RAW
//!             │
//!             ├─ now - last_hour_rollup >= hour window?
//!             │     mean_since(RAW) ──► prune_and_append(HOURLY) ──► prune(RAW)
//!             │
//!             └─ now - last_day_rollup >= day window?
//!                   mean_since(HOURLY) ──► prune_and_append(DAILY)
//! ```
//!
//! The hour check runs first because the daily mean is computed from the hourly log.
//! A timer only advances when its rollup was written, so an I/O failure is retried on
//! the next reading.

use super::log_store::{LogKind, LogStore};
use crate::config::Settings;
use crate::error::Result;
use crate::measurement::{format_timestamp, Reading};
use tracing::{debug, info, warn};

/// Window lengths and retention periods, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollupPolicy {
    /// Seconds between hourly rollups and width of the hourly mean
    pub hour_window_secs: i64,
    /// Seconds between daily rollups and width of the daily mean
    pub day_window_secs: i64,
    /// Raw readings older than this are pruned at each hourly rollup
    pub raw_retention_secs: i64,
    /// Hourly means older than this are dropped when a new one is written
    pub hourly_retention_secs: i64,
    /// Daily means older than this are dropped when a new one is written
    pub daily_retention_secs: i64,
}

impl Default for RollupPolicy {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl RollupPolicy {
    /// Windows from `[aggregation]`, retention from `[storage]`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            hour_window_secs: settings.aggregation.hour_window_secs,
            day_window_secs: settings.aggregation.day_window_secs,
            raw_retention_secs: settings.storage.raw_retention_secs,
            hourly_retention_secs: settings.storage.hourly_retention_secs,
            daily_retention_secs: settings.storage.daily_retention_secs,
        }
    }
}

/// Timestamps of the last successful rollups. Owned by the ingestion loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorState {
    /// Time of the last hourly mean written
    pub last_hour_rollup: i64,
    /// Time of the last daily mean written
    pub last_day_rollup: i64,
}

impl AggregatorState {
    /// Both timers start at `now`, so the first rollup fires one full window later.
    pub fn starting_at(now: i64) -> Self {
        Self {
            last_hour_rollup: now,
            last_day_rollup: now,
        }
    }
}

/// What one call to [`Aggregator::ingest`] wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IngestOutcome {
    /// The reading reached the raw log
    pub raw_appended: bool,
    /// Mean appended to the hourly log, if the hourly rollup fired and succeeded
    pub hourly_mean: Option<f64>,
    /// Mean appended to the daily log, if the daily rollup fired and succeeded
    pub daily_mean: Option<f64>,
}

/// Applies the rollup policy to a [`LogStore`].
pub struct Aggregator {
    store: LogStore,
    policy: RollupPolicy,
}

impl Aggregator {
    /// Aggregator writing to `store`.
    pub fn new(store: LogStore, policy: RollupPolicy) -> Self {
        Self { store, policy }
    }

    /// The log files this aggregator writes
    pub fn store(&self) -> &LogStore {
        &self.store
    }

    /// Process one reading, using its timestamp as the current time.
    ///
    /// Never fails: I/O errors are logged and the affected timer is left untouched.
    pub fn ingest(&self, state: &mut AggregatorState, reading: &Reading) -> IngestOutcome {
        let now = reading.timestamp;
        let mut outcome = IngestOutcome::default();

        match self.store.append(LogKind::Raw, reading) {
            Ok(()) => outcome.raw_appended = true,
            Err(e) => warn!(error = %e, "Failed to append reading to raw log"),
        }

        if now - state.last_hour_rollup >= self.policy.hour_window_secs {
            match self.hourly_rollup(now) {
                Ok(mean) => {
                    state.last_hour_rollup = now;
                    outcome.hourly_mean = Some(mean);
                }
                Err(e) => warn!(error = %e, "Hourly rollup failed, retrying on next reading"),
            }
        }

        if now - state.last_day_rollup >= self.policy.day_window_secs {
            match self.daily_rollup(now) {
                Ok(mean) => {
                    state.last_day_rollup = now;
                    outcome.daily_mean = Some(mean);
                }
                Err(e) => warn!(error = %e, "Daily rollup failed, retrying on next reading"),
            }
        }

        outcome
    }

    fn hourly_rollup(&self, now: i64) -> Result<f64> {
        let policy = &self.policy;
        let mean = self
            .store
            .mean_since(LogKind::Raw, now, policy.hour_window_secs)?;
        let kept = self.store.prune_and_append(
            LogKind::Hourly,
            now,
            policy.hourly_retention_secs,
            &Reading::new(now, mean),
        )?;
        info!(mean, kept, at = %format_timestamp(now), "Hourly rollup written");

        // The hourly entry is already on disk, so a failed raw prune must not hold back the timer
        match self.store.prune(LogKind::Raw, now, policy.raw_retention_secs) {
            Ok(remaining) => debug!(remaining, "Raw log pruned"),
            Err(e) => warn!(error = %e, "Failed to prune raw log"),
        }
        Ok(mean)
    }

    fn daily_rollup(&self, now: i64) -> Result<f64> {
        let policy = &self.policy;
        let mean = self
            .store
            .mean_since(LogKind::Hourly, now, policy.day_window_secs)?;
        let kept = self.store.prune_and_append(
            LogKind::Daily,
            now,
            policy.daily_retention_secs,
            &Reading::new(now, mean),
        )?;
        info!(mean, kept, at = %format_timestamp(now), "Daily rollup written");
        Ok(mean)
    }
}
