//! Synthetic log generator
//!
//! Fills a log directory with modelled temperatures so the HTTP frontend can be tried
//! without a sensor: one day of per-second raw readings, 30 days of hourly means and a
//! year of daily means, all ending now.
//!
//! ```bash
//! seed_logs                 # into the configured log directory
//! seed_logs ./build/logs
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, Months, Timelike};
use clap::Parser;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use templog::config::Settings;
use templog::hardware::mock::{daily_offset, model_temperature, seasonal_temperature};

#[derive(Parser)]
#[command(name = "seed_logs")]
#[command(about = "Write synthetic raw, hourly and daily temperature logs", long_about = None)]
struct Cli {
    /// Target directory (defaults to the configured log directory)
    log_dir: Option<PathBuf>,

    /// Days of hourly means to generate
    #[arg(long, default_value_t = 30)]
    hourly_days: i64,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("Failed to load configuration")?;
    let storage = &settings.storage;
    let log_dir = cli.log_dir.unwrap_or_else(|| storage.log_dir.clone());
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create {}", log_dir.display()))?;

    let now = Local::now().with_nanosecond(0).unwrap_or_else(Local::now);

    let raw = write_series(
        &log_dir.join(&storage.raw_file),
        now - Duration::days(1),
        now,
        Duration::seconds(1),
        |at| model_temperature(at),
    )?;

    let hourly = write_series(
        &log_dir.join(&storage.hourly_file),
        now - Duration::days(cli.hourly_days),
        now,
        Duration::hours(1),
        |at| seasonal_temperature(at) + daily_offset(f64::from(at.hour()) / 24.0),
    )?;

    let year_ago = now.checked_sub_months(Months::new(12)).unwrap_or(now - Duration::days(365));
    let daily = write_series(
        &log_dir.join(&storage.daily_file),
        year_ago,
        now,
        Duration::days(1),
        |at| seasonal_temperature(at),
    )?;

    println!("Seeded {}", log_dir.display());
    println!("   raw:    {raw} lines");
    println!("   hourly: {hourly} lines");
    println!("   daily:  {daily} lines");
    Ok(())
}

/// Write `"<unix_seconds> <value>"` lines from `start` (inclusive) to `end` (exclusive).
fn write_series(
    path: &Path,
    start: DateTime<Local>,
    end: DateTime<Local>,
    step: Duration,
    model: impl Fn(&DateTime<Local>) -> f64,
) -> Result<usize> {
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);

    let mut at = start;
    let mut lines = 0;
    while at < end {
        writeln!(out, "{} {:.5}", at.timestamp(), model(&at))?;
        at += step;
        lines += 1;
    }
    out.flush()?;
    Ok(lines)
}
