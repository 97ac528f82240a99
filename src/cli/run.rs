use crate::checkpoint::{load_or_default, CheckpointStore, FileCheckpointStore, Watermark};
use crate::config::parse::load_config;
use crate::fetch::LogFetcher;
use crate::scheduler::{CycleError, Scheduler, SchedulerSettings};
use crate::server::{start_server, StatusState};
use crate::sink::{DeliveryAdapter, HttpSink, Sink};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] crate::config::parse::ConfigError),

    #[error("fetcher error: {0}")]
    Fetcher(#[from] crate::fetch::FetchError),

    #[error("sink error: {0}")]
    Sink(#[from] crate::sink::SinkError),

    #[error("cycle error: {0}")]
    Cycle(#[from] CycleError),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub async fn run(config_path: Option<PathBuf>, once: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/logbridge/config.yml");
            eprintln!("  /etc/logbridge/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'logbridge config init' to generate one.");
            std::process::exit(1);
        }
    };

    run_pipeline(&config_path, once).await.map_err(|e| e.into())
}

async fn run_pipeline(config_path: &Path, once: bool) -> Result<(), RunError> {
    info!(config_path = %config_path.display(), "Loading configuration");
    let config = load_config(config_path)?;

    let sink = Arc::new(HttpSink::new(&config.sink)?);
    info!(url = %config.sink.url, log_type = %config.sink.log_type, "Log listener sink ready");

    let store: Arc<dyn CheckpointStore> =
        Arc::new(FileCheckpointStore::new(&config.checkpoint.path));
    let fallback = config.checkpoint.start_from.unwrap_or_else(Watermark::now);
    let watermark = load_or_default(store.as_ref(), fallback).await;

    let fetcher = LogFetcher::new(&config.api)?;
    info!(url = %fetcher.url(), account_id = config.api.account_id, "Audit log fetcher ready");

    let adapter = DeliveryAdapter::new(sink.clone(), config.sink.concurrency);
    let mut scheduler = Scheduler::new(
        fetcher,
        adapter,
        store,
        SchedulerSettings::from_config(&config),
        watermark,
    );

    if once {
        let result = scheduler.run_once().await;
        if let Err(e) = sink.flush().await {
            warn!(error = %e, "Failed to flush sink");
        }
        result?;
        return Ok(());
    }

    let shutdown = CancellationToken::new();

    let server_handle = config.status_listen_addr().map(|addr| {
        let state = Arc::new(StatusState::new(scheduler.status()));
        let server_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = start_server(addr, state, server_shutdown).await {
                error!(error = %e, "Status server error");
            }
        })
    });

    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));

    info!("Collector started, press Ctrl+C to shutdown");

    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
    }
    shutdown.cancel();

    info!("Waiting for the current cycle to finish");
    scheduler_handle.await?;

    if let Some(handle) = server_handle {
        handle.await?;
    }

    info!("Shutdown complete");
    Ok(())
}
