//! Flat-file storage for the raw, hourly and daily logs.
//!
//! Each log is a sequence of `"<unix_seconds> <value>\n"` lines written oldest-first.
//! There are two mutating operations:
//!
//! - **append**: add one line at the end
//! - **prune and append**: rewrite the file keeping only lines inside a retention window,
//!   then add one line
//!
//! Rewrites go through a sibling `<name>.tmp` file that is renamed over the original, so a
//! concurrent reader (the HTTP handlers) always sees either the old or the new file and a
//! crash mid-rewrite never leaves the log truncated. [`LogStore::prepare`] promotes or
//! discards a leftover temp file on the next start.

use crate::config::StorageConfig;
use crate::error::Result;
use crate::measurement::Reading;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Which of the three logs an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    /// Every accepted reading
    Raw,
    /// One mean per hour window
    Hourly,
    /// One mean per day window
    Daily,
}

impl LogKind {
    /// All logs, finest resolution first.
    pub const ALL: [LogKind; 3] = [LogKind::Raw, LogKind::Hourly, LogKind::Daily];

    /// Short lowercase name used in log messages.
    pub fn name(self) -> &'static str {
        match self {
            LogKind::Raw => "raw",
            LogKind::Hourly => "hourly",
            LogKind::Daily => "daily",
        }
    }
}

/// What [`recover`] did with a leftover temp file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// No temp file was present
    Clean,
    /// The log was missing and the temp file was renamed into place
    Promoted,
    /// Both files existed; the temp file was removed
    DiscardedTemp,
}

/// The three log files of one installation.
#[derive(Debug, Clone)]
pub struct LogStore {
    dir: PathBuf,
    raw: PathBuf,
    hourly: PathBuf,
    daily: PathBuf,
}

impl LogStore {
    /// Log files named `raw`, `hourly` and `daily` inside `dir`. Nothing is created until [`prepare`](Self::prepare).
    pub fn new(dir: impl Into<PathBuf>, raw: &str, hourly: &str, daily: &str) -> Self {
        let dir = dir.into();
        Self {
            raw: dir.join(raw),
            hourly: dir.join(hourly),
            daily: dir.join(daily),
            dir,
        }
    }

    /// Store described by `[storage]`.
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(
            &config.log_dir,
            &config.raw_file,
            &config.hourly_file,
            &config.daily_file,
        )
    }

    /// Create the log directory and any missing log file, recovering interrupted rewrites first.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        for kind in LogKind::ALL {
            let path = self.path(kind);
            match recover(path)? {
                Recovery::Clean => {}
                Recovery::Promoted => {
                    warn!(log = kind.name(), path = %path.display(), "Restored log from interrupted rewrite")
                }
                Recovery::DiscardedTemp => {
                    debug!(log = kind.name(), "Removed stale temp file")
                }
            }
            OpenOptions::new().create(true).append(true).open(path)?;
        }
        info!(dir = %self.dir.display(), "Log store ready");
        Ok(())
    }

    /// Directory holding the three logs
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of one log
    pub fn path(&self, kind: LogKind) -> &Path {
        match kind {
            LogKind::Raw => &self.raw,
            LogKind::Hourly => &self.hourly,
            LogKind::Daily => &self.daily,
        }
    }

    /// See [`append`].
    pub fn append(&self, kind: LogKind, reading: &Reading) -> Result<()> {
        append(self.path(kind), reading)
    }

    /// See [`mean_since`].
    pub fn mean_since(&self, kind: LogKind, now: i64, window_secs: i64) -> Result<f64> {
        mean_since(self.path(kind), now, window_secs)
    }

    /// See [`prune`].
    pub fn prune(&self, kind: LogKind, now: i64, retention_secs: i64) -> Result<usize> {
        prune(self.path(kind), now, retention_secs)
    }

    /// See [`prune_and_append`].
    pub fn prune_and_append(
        &self,
        kind: LogKind,
        now: i64,
        retention_secs: i64,
        reading: &Reading,
    ) -> Result<usize> {
        prune_and_append(self.path(kind), now, retention_secs, reading)
    }

    /// Whole file contents, exactly as stored.
    pub fn read_all(&self, kind: LogKind) -> Result<Vec<u8>> {
        Ok(fs::read(self.path(kind))?)
    }
}

/// Append one log line and flush it.
pub fn append(path: &Path, reading: &Reading) -> Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(reading.to_log_line().as_bytes())?;
    file.flush()?;
    Ok(())
}

/// Arithmetic mean of the values with `0 <= now - timestamp < window_secs`.
///
/// Stale, future-dated and malformed lines are skipped, so the result does not
/// depend on line order. Returns `0.0` when no line is inside the window.
pub fn mean_since(path: &Path, now: i64, window_secs: i64) -> Result<f64> {
    let mut sum = 0.0;
    let mut count = 0u64;
    for_each_reading(path, |_, reading| {
        let age = reading.age(now);
        if (0..window_secs).contains(&age) {
            sum += reading.value;
            count += 1;
        }
    })?;

    Ok(if count > 0 { sum / count as f64 } else { 0.0 })
}

/// Rewrite `path` keeping lines younger than `retention_secs`. Returns the number of lines kept.
pub fn prune(path: &Path, now: i64, retention_secs: i64) -> Result<usize> {
    rewrite(path, |reading| reading.age(now) < retention_secs, None)
}

/// Rewrite `path` keeping lines younger than `retention_secs`, then append `reading`.
///
/// Lines whose timestamp is not older than `reading` are dropped as superseded, so the
/// appended line is always last and replaying the same call leaves a single copy.
/// Returns the number of lines kept, not counting the appended one.
pub fn prune_and_append(
    path: &Path,
    now: i64,
    retention_secs: i64,
    reading: &Reading,
) -> Result<usize> {
    rewrite(
        path,
        |kept| kept.age(now) < retention_secs && kept.timestamp < reading.timestamp,
        Some(reading),
    )
}

/// Put a log back in place after an interrupted rewrite.
pub fn recover(path: &Path) -> Result<Recovery> {
    let temp = temp_path(path);
    if !temp.exists() {
        return Ok(Recovery::Clean);
    }
    if path.exists() {
        fs::remove_file(&temp)?;
        Ok(Recovery::DiscardedTemp)
    } else {
        fs::rename(&temp, path)?;
        Ok(Recovery::Promoted)
    }
}

/// Sibling path used while rewriting `path`.
pub fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn rewrite(
    path: &Path,
    mut keep: impl FnMut(&Reading) -> bool,
    append_reading: Option<&Reading>,
) -> Result<usize> {
    // Restore from a previous crash before reading, otherwise the rewrite would start empty
    recover(path)?;

    let temp = temp_path(path);
    let mut out = BufWriter::new(File::create(&temp)?);
    let mut kept = 0usize;
    let mut write_err = None;

    for_each_reading(path, |raw, reading| {
        if write_err.is_some() || !keep(&reading) {
            return;
        }
        match out
            .write_all(raw.trim_end_matches('\r').as_bytes())
            .and_then(|_| out.write_all(b"\n"))
        {
            Ok(()) => kept += 1,
            Err(e) => write_err = Some(e),
        }
    })?;
    if let Some(e) = write_err {
        return Err(e.into());
    }

    if let Some(reading) = append_reading {
        out.write_all(reading.to_log_line().as_bytes())?;
    }
    let file = out.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp, path)?;
    Ok(kept)
}

/// Call `f` with every well-formed line of `path`, oldest first. A missing file has no lines.
fn for_each_reading(path: &Path, mut f: impl FnMut(&str, Reading)) -> Result<()> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for line in BufReader::new(file).split(b'\n') {
        let line = line?;
        let text = String::from_utf8_lossy(&line);
        if let Some(reading) = Reading::from_log_line(&text) {
            f(&text, reading);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_lines(path: &Path, lines: &[&str]) {
        let mut content = lines.join("\n");
        content.push('\n');
        fs::write(path, content).unwrap();
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_append_creates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.log");

        append(&path, &Reading::new(100, 23.5)).unwrap();
        append(&path, &Reading::new(101, 24.0)).unwrap();

        assert_eq!(read(&path), "100 23.5\n101 24\n");
    }

    #[test]
    fn test_append_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("raw.log");
        assert!(append(&path, &Reading::new(1, 1.0)).is_err());
    }

    #[test]
    fn test_mean_since_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.log");
        let t = 1_000;
        write_lines(&path, &["1000 10", "1010 20"]);

        assert_eq!(mean_since(&path, t + 10, 3600).unwrap(), 15.0);
        assert_eq!(mean_since(&path, t + 10, 5).unwrap(), 20.0);
    }

    #[test]
    fn test_mean_since_no_data_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.log");

        assert_eq!(mean_since(&path, 100, 3600).unwrap(), 0.0);

        write_lines(&path, &["10 5.0"]);
        assert_eq!(mean_since(&path, 10_000, 60).unwrap(), 0.0);
    }

    #[test]
    fn test_mean_since_skips_malformed_and_future_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.log");
        write_lines(&path, &["garbage", "100 1.0", "100", "105 N/A", "110 3.0", "500 99.0"]);

        assert_eq!(mean_since(&path, 110, 60).unwrap(), 2.0);
    }

    #[test]
    fn test_mean_since_window_is_half_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.log");
        write_lines(&path, &["0 100.0", "1 1.0"]);

        // age 3600 is outside a 3600s window, age 3599 is inside
        assert_eq!(mean_since(&path, 3600, 3600).unwrap(), 1.0);
    }

    #[test]
    fn test_prune_and_append_keeps_order_and_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hourly.log");
        write_lines(&path, &["100 1", "200 2", "300 3"]);

        let kept = prune_and_append(&path, 350, 200, &Reading::new(350, 4.0)).unwrap();

        assert_eq!(kept, 2);
        assert_eq!(read(&path), "200 2\n300 3\n350 4\n");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_prune_and_append_replay_keeps_one_copy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hourly.log");
        write_lines(&path, &["100 1", "200 2"]);
        let reading = Reading::new(250, 7.5);

        prune_and_append(&path, 250, 1000, &reading).unwrap();
        prune_and_append(&path, 250, 1000, &reading).unwrap();

        assert_eq!(read(&path), "100 1\n200 2\n250 7.5\n");
    }

    #[test]
    fn test_prune_and_append_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("daily.log");

        prune_and_append(&path, 10, 100, &Reading::new(10, 1.5)).unwrap();
        assert_eq!(read(&path), "10 1.5\n");
    }

    #[test]
    fn test_prune_drops_old_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw.log");
        write_lines(&path, &["10 1", "junk", "90 2", "95 3"]);

        assert_eq!(prune(&path, 100, 20).unwrap(), 2);
        assert_eq!(read(&path), "90 2\n95 3\n");
    }

    #[test]
    fn test_recover_promotes_temp_when_log_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hourly.log");
        fs::write(temp_path(&path), "5 1\n").unwrap();

        assert_eq!(recover(&path).unwrap(), Recovery::Promoted);
        assert_eq!(read(&path), "5 1\n");
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn test_recover_discards_stale_temp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hourly.log");
        fs::write(&path, "5 1\n").unwrap();
        fs::write(temp_path(&path), "5 1\n6 2\n").unwrap();

        assert_eq!(recover(&path).unwrap(), Recovery::DiscardedTemp);
        assert_eq!(read(&path), "5 1\n");
        assert_eq!(recover(&path).unwrap(), Recovery::Clean);
    }

    #[test]
    fn test_rewrite_after_interrupted_rewrite_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hourly.log");
        // Crash between removing the original and renaming the temp file
        fs::write(temp_path(&path), "100 1\n").unwrap();

        prune_and_append(&path, 200, 1000, &Reading::new(200, 2.0)).unwrap();
        assert_eq!(read(&path), "100 1\n200 2\n");
    }

    #[test]
    fn test_store_prepare_creates_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::new(dir.path().join("logs"), "all.log", "hour.log", "day.log");

        store.prepare().unwrap();

        for kind in LogKind::ALL {
            assert!(store.path(kind).exists(), "{} log missing", kind.name());
            assert!(store.read_all(kind).unwrap().is_empty());
        }
    }

    #[test]
    fn test_store_prepare_keeps_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = LogStore::new(dir.path(), "all.log", "hour.log", "day.log");
        fs::write(store.path(LogKind::Hourly), "1 2\n").unwrap();

        store.prepare().unwrap();
        assert_eq!(store.read_all(LogKind::Hourly).unwrap(), b"1 2\n");
    }
}
