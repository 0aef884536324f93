//! Log persistence and time-windowed rollups.
pub mod aggregator;
pub mod log_store;

pub use aggregator::{Aggregator, AggregatorState, IngestOutcome, RollupPolicy};
pub use log_store::{LogKind, LogStore};
