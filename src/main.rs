//! Image harvester
//!
//! Best-effort multi-source image acquisition: for each hardcoded query,
//! ask every search provider for candidate URLs, download them, filter by
//! size/resolution/orientation and content-hash deduplication, persist the
//! survivors, and regenerate the manifest.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Error};
use tracing::info;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config_loader::{AppConfig, ConfigManager};
use crate::harvest_engine::HarvestEngine;

mod config_loader;
mod fetcher;
mod harvest_engine;
mod hash_store;
mod image_validator;
mod manifest_writer;
mod providers;

/// Queries processed strictly in this order
const QUERIES: &[&str] = &[
    "diverse tech professionals meeting vancouver office glass walls",
    "happy international students university of toronto campus laughing",
    "young family walking stanley park vancouver autumn",
    "multicultural group business people downtown toronto street",
    "graduate students throwing hats university of british columbia",
    "tech workers coding modern office montreal",
    "new immigrants airport welcome hug canada",
    "diverse startup team celebrating success canada",
    "asian family hiking banff national park summer",
    "canadian citizenship ceremony oath taking smiling",
    "international business professionals shaking hands toronto skyline background",
    "construction engineer looking at blueprints toronto condo",
    "healthcare workers canada hospital diverse team",
    "happy couple holding canadian flags city background",
];

/// Initialize the tracing subscriber from the logging config
///
/// The file layer rolls daily; the returned guard must stay alive for the
/// whole run so buffered log lines are flushed on exit.
fn init_tracing(
    config: &AppConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, Error> {
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.log_level))
        .context("invalid log level in config")?;

    let console_layer = if config.logging.log_to_terminal {
        Some(tracing_subscriber::fmt::layer())
    } else {
        None
    };

    let (file_layer, guard) = if config.logging.log_to_file {
        let log_dir = Path::new(&config.paths.log_directory);
        std::fs::create_dir_all(log_dir)
            .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

        let file_appender = tracing_appender::rolling::daily(log_dir, "image_harvester.log");
        let (writer, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false);

        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::msg(e.to_string()))?;

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config_manager =
        Arc::new(ConfigManager::new("./config").context("failed to load configuration")?);
    let config = config_manager.get_app_config()?;

    let _log_guard = init_tracing(&config)?;

    info!("image_harvester v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Output directory: {}, {} queries",
        config.paths.output_directory,
        QUERIES.len()
    );

    let engine = HarvestEngine::from_config(&config_manager)?;
    engine.run(QUERIES).await.context("harvest run failed")?;

    Ok(())
}
