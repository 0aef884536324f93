//! Ingestion loop: serial lines in, log files out.
//!
//! Owns the line source, the parser, the [`Aggregator`] and its [`AggregatorState`].
//! Runs on a blocking thread for the lifetime of the process.

use crate::data::{Aggregator, AggregatorState, IngestOutcome};
use crate::error::Result;
use crate::hardware::LineSource;
use crate::measurement::{unix_now, LineParser};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Pause after a failed read so an unplugged device does not spin the loop.
const READ_ERROR_BACKOFF: Duration = Duration::from_secs(1);

/// Result of one [`IngestionLoop::step`].
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The read timed out with no data
    Idle,
    /// A line arrived but was not a number
    Skipped,
    /// A reading was handed to the aggregator
    Ingested(IngestOutcome),
}

/// Source, parser and aggregator driven one line at a time.
pub struct IngestionLoop<S: LineSource> {
    source: S,
    parser: LineParser,
    aggregator: Aggregator,
    state: AggregatorState,
    clock: Box<dyn FnMut() -> i64 + Send>,
}

impl<S: LineSource> IngestionLoop<S> {
    /// Build a loop whose rollup timers start now.
    pub fn new(source: S, parser: LineParser, aggregator: Aggregator) -> Self {
        Self {
            source,
            parser,
            aggregator,
            state: AggregatorState::starting_at(unix_now()),
            clock: Box::new(unix_now),
        }
    }

    /// Replace the wall clock, e.g. with a simulated one. Also restarts the rollup timers
    /// at the new clock's current time.
    pub fn with_clock(mut self, mut clock: impl FnMut() -> i64 + Send + 'static) -> Self {
        self.state = AggregatorState::starting_at(clock());
        self.clock = Box::new(clock);
        self
    }

    /// Current rollup timers
    pub fn state(&self) -> &AggregatorState {
        &self.state
    }

    /// The aggregator and, through it, the log store
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Read at most one line and process it.
    pub fn step(&mut self) -> Result<Step> {
        let line = match self.source.read_line()? {
            Some(line) => line,
            None => return Ok(Step::Idle),
        };

        let now = (self.clock)();
        match self.parser.parse_at(&line, now) {
            Ok(reading) => Ok(Step::Ingested(
                self.aggregator.ingest(&mut self.state, &reading),
            )),
            Err(e) => {
                debug!(error = %e, "Skipping malformed line");
                Ok(Step::Skipped)
            }
        }
    }

    /// Run until the process exits or the source reports an unrecoverable error.
    pub fn run(mut self) -> Result<()> {
        info!(source = self.source.name(), "Ingestion loop started");
        loop {
            match self.step() {
                Ok(_) => {}
                Err(e) if e.is_recoverable() => {
                    warn!(source = self.source.name(), error = %e, "Read failed");
                    std::thread::sleep(READ_ERROR_BACKOFF);
                }
                Err(e) => {
                    error!(source = self.source.name(), error = %e, "Ingestion stopped");
                    return Err(e);
                }
            }
        }
    }
}
