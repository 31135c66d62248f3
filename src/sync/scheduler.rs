//! Periodic sync scheduler
//!
//! Runs a [`Syncable`] once on startup and then every `sync_interval`, with
//! optional random jitter. Runs never overlap: the next tick is only awaited
//! once the previous run has returned. A run in progress is never cancelled;
//! shutdown takes effect between runs.

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::report::RunSummary;

/// Configuration for the sync scheduler
#[derive(Debug, Clone, Default)]
pub struct SchedulerConfig {
    /// Initial delay before the first run (seconds)
    pub initial_delay_secs: u64,
    /// Jitter range (seconds) added before each scheduled run
    pub jitter_secs: u64,
}

impl From<&SyncConfig> for SchedulerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self {
            initial_delay_secs: config.initial_delay_secs,
            jitter_secs: config.jitter_secs,
        }
    }
}

/// Something the scheduler can run periodically
#[async_trait]
pub trait Syncable: Send + Sync {
    /// Get the name of this source
    fn name(&self) -> &str;

    /// Get the interval between runs
    fn sync_interval(&self) -> Duration;

    /// Perform one run
    async fn sync(&self) -> RunSummary;
}

/// Sync scheduler for a single source
pub struct SyncScheduler {
    config: SchedulerConfig,
    source: Arc<dyn Syncable>,
    shutdown_rx: broadcast::Receiver<()>,
}

impl SyncScheduler {
    pub fn new(
        config: SchedulerConfig,
        source: Arc<dyn Syncable>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            source,
            shutdown_rx,
        }
    }

    /// Run until a shutdown signal arrives
    pub async fn run(mut self) {
        let name = self.source.name().to_string();
        let interval = self.source.sync_interval().max(Duration::from_secs(1));
        info!(
            source = name,
            interval_secs = interval.as_secs(),
            "Starting sync scheduler"
        );

        if self.config.initial_delay_secs > 0 {
            debug!(
                delay_secs = self.config.initial_delay_secs,
                "Waiting for initial delay"
            );
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received before first run");
                    return;
                }
                _ = tokio::time::sleep(Duration::from_secs(self.config.initial_delay_secs)) => {}
            }
        }

        info!(source = name, "Performing initial sync");
        self.perform_sync(interval).await;

        let mut interval_timer = interval_at(Instant::now() + interval, interval);
        interval_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping sync scheduler");
                    break;
                }
                _ = interval_timer.tick() => {
                    let jitter = self.jitter();
                    if !jitter.is_zero() {
                        debug!(source = name, jitter_secs = jitter.as_secs(), "Applying jitter");
                        tokio::time::sleep(jitter).await;
                    }

                    info!(source = name, "Performing scheduled sync");
                    self.perform_sync(interval).await;
                }
            }
        }

        info!("Sync scheduler stopped");
    }

    fn jitter(&self) -> Duration {
        if self.config.jitter_secs > 0 {
            Duration::from_secs(rand::thread_rng().gen_range(0..self.config.jitter_secs))
        } else {
            Duration::ZERO
        }
    }

    async fn perform_sync(&self, interval: Duration) {
        let name = self.source.name();
        let summary = self.source.sync().await;

        if summary.fatal.is_some() {
            warn!(source = name, "Sync run could not start");
        } else if summary.has_errors() {
            warn!(
                source = name,
                lists = summary.lists.len(),
                files_synced = summary.files_synced(),
                "Sync completed with errors"
            );
        } else {
            info!(
                source = name,
                lists = summary.lists.len(),
                "Sync completed"
            );
        }
        debug!(source = name, next_in_secs = interval.as_secs(), "Next sync scheduled");
    }
}
