pub(crate) mod config;
pub(crate) mod import;
pub(crate) mod show;
pub(crate) mod update;
pub(crate) mod worker;

use std::path::{Path, PathBuf};

use pulse_enrich::{Enricher, Shutdown, ShutdownTrigger, shutdown_channel};
use pulse_providers::ProviderConfig;
use rusqlite::Connection;

use crate::CliError;

/// Default database location: `<data dir>/pulse/pulse.db`.
pub(crate) fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("pulse")
        .join("pulse.db")
}

pub(crate) fn open_db(path: &Path) -> Result<Connection, CliError> {
    pulse_db::open_database(path).map_err(|e| {
        CliError::database(format!("Failed to open {}: {}", path.display(), e))
    })
}

pub(crate) fn runtime() -> Result<tokio::runtime::Runtime, CliError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime(format!("Failed to create tokio runtime: {}", e)))
}

/// Build the provider-backed enricher, stopping on Ctrl-C.
///
/// Must be called inside the runtime: the signal listener is a spawned task.
pub(crate) fn live_enricher() -> Result<Enricher, CliError> {
    let config = ProviderConfig::load().map_err(|e| CliError::config(e.to_string()))?;
    if config.altmetric_key.is_none() {
        log::debug!("No attention-metrics key set, calling without one");
    }
    if !config.has_mendeley_credentials() {
        log::warn!("No readership credentials set; the readership phase will be skipped");
    }
    let enricher = Enricher::from_config(&config)
        .map_err(|e| CliError::config(format!("Failed to set up providers: {}", e)))?;
    Ok(enricher.with_shutdown(ctrl_c_shutdown()))
}

fn ctrl_c_shutdown() -> Shutdown {
    let (trigger, shutdown) = shutdown_channel();
    tokio::spawn(watch_ctrl_c(trigger));
    shutdown
}

async fn watch_ctrl_c(trigger: ShutdownTrigger) {
    if tokio::signal::ctrl_c().await.is_ok() {
        log::warn!("Interrupted, finishing the current request before stopping...");
        trigger.trigger();
    }
}
