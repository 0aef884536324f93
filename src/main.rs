//! CLI Entry Point for templog
//!
//! Starts the ingestion loop on the configured serial device and the HTTP server that
//! publishes the logs.
//!
//! # Usage
//!
//! ```bash
//! templog                        # defaults from config/templog.toml
//! templog /dev/ttyUSB0           # override the device
//! templog mock 0.0.0.0 8080      # simulated sensor, all interfaces
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use templog::config::Settings;
use templog::{daemon, logging};

#[derive(Parser)]
#[command(name = "templog")]
#[command(about = "Serial temperature logger with an HTTP frontend", long_about = None)]
struct Cli {
    /// Serial device name, or "mock" for the simulated sensor
    device: Option<String>,

    /// Address the HTTP server binds to
    host: Option<String>,

    /// Port the HTTP server binds to
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load()
        .context("Failed to load configuration")?
        .with_overrides(cli.device, cli.host, cli.port);
    settings.validate().context("Invalid configuration")?;

    logging::init_from_settings(&settings)
        .map_err(anyhow::Error::msg)
        .context("Failed to initialize logging")?;

    println!("{} - serial temperature logger", settings.application.name);
    println!("   Device: {}", settings.serial.device);
    println!("   Logs:   {}", settings.storage.log_dir.display());
    println!();

    daemon::run(settings)
        .await
        .context("Neither the ingestion loop nor the HTTP server could start")
}
