//! # templog Core Library
//!
//! Reads temperatures from a serial sensor, keeps raw, hourly and daily logs on disk,
//! and serves them over a small hand-written HTTP server.
//!
//! ## Crate Structure
//!
//! - **`config`**: Layered `figment` configuration. See `config::Settings`.
//! - **`daemon`**: Starts the ingestion and serving loops side by side.
//! - **`data`**: The `LogStore` for the three log files and the `Aggregator` that rolls raw
//!   readings up into hourly and daily means.
//! - **`error`**: The crate-wide `TemplogError` enum.
//! - **`hardware`**: The `LineSource` trait with serial, simulated and scripted sources.
//! - **`ingest`**: The loop that turns source lines into log entries.
//! - **`logging`**: `tracing` subscriber setup.
//! - **`measurement`**: `Reading` and the `LineParser` for the sensor's line format.
//! - **`network`**: Request parsing, routing, static files and the accept loop.
//!
//! The ingestion and serving loops never share memory. The log files are the only
//! hand-off, and every rewrite goes through a temp file and a rename so the server always
//! reads a complete file.

pub mod config;
pub mod daemon;
pub mod data;
pub mod error;
pub mod hardware;
pub mod ingest;
pub mod logging;
pub mod measurement;
pub mod network;
