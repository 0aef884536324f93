//! Process wiring: the ingestion loop and the serving loop.
//!
//! The two loops share nothing but the log directory. A startup failure in one is logged
//! and leaves the other running; [`run`] only returns once both have stopped.

use crate::config::Settings;
use crate::data::{Aggregator, LogStore, RollupPolicy};
use crate::error::{Result, TemplogError};
use crate::hardware::{open_source, LineSource};
use crate::ingest::IngestionLoop;
use crate::measurement::LineParser;
use crate::network::{log_routes, HttpServer, Router, ServerOptions, StaticFiles};
use tracing::{error, info};

/// Route table for `settings`: the three log routes plus static file fallback.
pub fn build_router(settings: &Settings) -> Router {
    log_routes(
        LogStore::from_config(&settings.storage),
        StaticFiles::from_config(&settings.server),
    )
}

/// Bind the HTTP server described by `settings.server`.
pub async fn start_server(settings: &Settings) -> Result<HttpServer> {
    let addr = settings.server.bind_addr();
    let server = HttpServer::bind(
        &addr,
        build_router(settings),
        ServerOptions::from_config(&settings.server),
    )
    .await?;

    let local = server.local_addr()?;
    info!("Server started! Open in your browser: http://{}:{}/", local.ip(), local.port());
    Ok(server)
}

/// Serving loop. Returns only if the listener could not be bound.
pub async fn serve(settings: &Settings) -> Result<()> {
    let server = start_server(settings).await.inspect_err(|e| {
        error!(error = %e, "HTTP server failed to start");
    })?;
    server.serve().await
}

/// Build the ingestion loop for the configured device and log directory.
pub fn build_ingestion(settings: &Settings) -> Result<IngestionLoop<Box<dyn LineSource>>> {
    let source = open_source(&settings.serial)?;
    let store = LogStore::from_config(&settings.storage);
    store.prepare()?;

    info!(
        device = %settings.serial.device,
        baud_rate = settings.serial.baud_rate,
        log_dir = %store.dir().display(),
        "Ingestion source opened"
    );

    let aggregator = Aggregator::new(store, RollupPolicy::from_settings(settings));
    Ok(IngestionLoop::new(
        source,
        LineParser::new(settings.serial.marker),
        aggregator,
    ))
}

/// Ingestion loop. Returns if the source or log directory could not be opened, or when
/// the source fails for good.
pub async fn ingest(settings: &Settings) -> Result<()> {
    let ingestion = build_ingestion(settings).inspect_err(|e| {
        error!(error = %e, "Ingestion failed to start");
    })?;

    tokio::task::spawn_blocking(move || ingestion.run())
        .await
        .map_err(|e| TemplogError::Io(std::io::Error::other(e.to_string())))?
}

/// Run both loops until the process exits.
///
/// Fails only when neither loop could start.
pub async fn run(settings: Settings) -> Result<()> {
    let (served, ingested) = tokio::join!(serve(&settings), ingest(&settings));
    match (served, ingested) {
        (Err(served), Err(_)) => Err(served),
        _ => Ok(()),
    }
}
