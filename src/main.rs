//! # DSU Bridge
//!
//! Feed head-tracking poses to emulators as DSU (cemuhook) controller motion.
//!
//! This application receives opentrack "UDP over network" pose datagrams and
//! serves them to DSU clients as the motion data of a virtual controller.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use dsu_bridge::bridge::Bridge;
use dsu_bridge::config::{Config, LoggingConfig};

/// Configuration file used when no path is given
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Log file name prefix inside the log directory
const LOG_FILE_PREFIX: &str = "dsu-bridge.log";

/// Install the tracing subscriber
///
/// `RUST_LOG` overrides the configured level. The returned guard must be
/// kept alive for buffered file output to be flushed.
fn init_logging(logging: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let (file_layer, guard) = if logging.file {
        let appender = tracing_appender::rolling::daily(&logging.dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    guard
}

/// Main entry point for DSU Bridge
///
/// # Control Flow
///
/// 1. Load configuration (first argument, or `config/default.toml`)
/// 2. Set up logging
/// 3. Start the bridge: tracking listener, broadcast worker and, unless in
///    debug mode, the DSU listener
/// 4. Wait for Ctrl+C, then stop all pipelines
///
/// # Errors
///
/// Returns error if the configuration is missing or invalid, or if a socket
/// cannot be bound.
#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load configuration from {}", config_path.display()))?;

    let _log_guard = init_logging(&config.logging);

    info!("DSU Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let bridge = Bridge::start(&config).await.context("failed to start bridge")?;

    info!("Press Ctrl+C to exit");
    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl+C")?;

    info!("Received Ctrl+C, shutting down...");
    bridge.shutdown().await;

    Ok(())
}
