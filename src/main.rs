//! contact-sync - Keeps remote mailing lists in line with CSV contact extracts
//!
//! This is the main entry point for the contact-sync application.

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::info;

use contact_sync::config::Config;
use contact_sync::logging::init_tracing;
use contact_sync::sync::{SchedulerConfig, SyncRunner, SyncScheduler};

/// contact-sync - Keeps remote mailing lists in line with CSV contact extracts
#[derive(Parser, Debug)]
#[command(name = "contact-sync")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "CONTACT_SYNC_CONFIG")]
    config: Option<String>,

    /// Run once and exit instead of scheduling
    #[arg(long)]
    once: bool,

    /// Reconcile every list even if its source file is unchanged
    #[arg(long)]
    force: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = load_config(&args)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    init_tracing(&config.logging.level, &config.logging.format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        lists = config.sync.lists.len(),
        lists_file = config.sync.lists_file.as_deref().unwrap_or(""),
        "Starting contact-sync"
    );

    let scheduler_config = SchedulerConfig::from(&config.sync);
    let runner = SyncRunner::from_config(config).with_force(args.force);

    if args.once {
        let summary = runner.run_once().await;
        info!(
            files_synced = summary.files_synced(),
            has_errors = summary.has_errors(),
            "contact-sync finished"
        );
        if let Some(fatal) = summary.fatal {
            anyhow::bail!(fatal);
        }
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let scheduler = SyncScheduler::new(scheduler_config, Arc::new(runner), shutdown_rx);
    let handle = tokio::spawn(scheduler.run());

    shutdown_signal().await;
    let _ = shutdown_tx.send(());
    handle.await?;

    info!("contact-sync shutdown complete");
    Ok(())
}

/// Load configuration from file or environment
fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
        None => {
            eprintln!("Loading configuration from environment variables");
            Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
    }
}

/// Create a future that resolves when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, finishing current run before shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, finishing current run before shutdown");
        }
    }
}
