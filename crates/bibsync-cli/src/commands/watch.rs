//! Watch command - Poll continuously until interrupted
//!
//! Runs a sync cycle immediately and then every `sync.poll_interval`
//! seconds. Group memberships are re-read each cycle. On Unix, `SIGUSR1`
//! starts a cycle right away (`kill -USR1 <pid>`). Ctrl-C or `SIGTERM` stops
//! the loop; a cycle still in flight is abandoned without persisting anything
//! for the library it was working on.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use bibsync_core::config::Config;
use bibsync_sync::{PollScheduler, SyncEngine, SyncOptions};

use crate::bootstrap;
use crate::output::{get_formatter, print_report, OutputFormat};

#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Seconds between cycles (overrides sync.poll_interval)
    #[arg(long)]
    pub interval: Option<u64>,

    /// Only synchronize the personal library
    #[arg(long)]
    pub no_groups: bool,
}

impl WatchCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        bootstrap::ensure_valid(config)?;
        let remote = Arc::new(bootstrap::connect_remote(config)?);
        let store = Arc::new(bootstrap::open_store(config).await?);
        let user = bootstrap::resolve_user(&remote, config).await?;
        let include_groups = config.sync.include_groups && !self.no_groups;
        let engine = Arc::new(SyncEngine::new(remote.clone(), store, &config.sync));

        let interval = self.interval.unwrap_or(config.sync.poll_interval);
        let shutdown = CancellationToken::new();
        let scheduler = Arc::new(PollScheduler::new(
            Duration::from_secs(interval),
            shutdown.clone(),
        ));

        tokio::spawn(shutdown_signal(shutdown.clone()));
        spawn_sync_now_listener(scheduler.clone(), shutdown.clone());

        formatter.success(&format!(
            "Watching libraries of user {} every {}s (Ctrl-C to stop)",
            user.id, interval
        ));
        formatter.info(&format!(
            "Send SIGUSR1 to process {} to sync immediately",
            std::process::id()
        ));

        let cycles = scheduler
            .run(|| {
                let engine = engine.clone();
                let remote = remote.clone();
                let user = user.clone();
                async move {
                    let groups =
                        match bootstrap::resolve_groups(&remote, &user, include_groups).await {
                            Ok(groups) => groups,
                            Err(err) => {
                                warn!(error = %format!("{err:#}"), "Skipping cycle");
                                return;
                            }
                        };

                    let report = engine.sync_all(&user, &groups, SyncOptions::default()).await;
                    if let Err(err) = print_report(&report, format, &*get_formatter(format)) {
                        warn!(error = %format!("{err:#}"), "Failed to print sync report");
                    }
                }
            })
            .await;

        formatter.success(&format!("Stopped after {cycles} completed cycles"));
        Ok(())
    }
}

/// Cancels `token` on Ctrl-C or `SIGTERM`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Interrupt received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }

    token.cancel();
}

/// A source of "sync now" requests
#[async_trait]
trait SyncTrigger: Send {
    /// Waits for the next request; `false` once the source is closed
    async fn triggered(&mut self) -> bool;
}

#[cfg(unix)]
#[async_trait]
impl SyncTrigger for tokio::signal::unix::Signal {
    async fn triggered(&mut self) -> bool {
        self.recv().await.is_some()
    }
}

#[cfg(unix)]
fn spawn_sync_now_listener(scheduler: Arc<PollScheduler>, shutdown: CancellationToken) {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::user_defined1()) {
        Ok(sigusr1) => {
            tokio::spawn(forward_sync_requests(scheduler, shutdown, sigusr1));
        }
        Err(err) => warn!(error = %err, "Failed to install SIGUSR1 handler, sync-now disabled"),
    }
}

#[cfg(not(unix))]
fn spawn_sync_now_listener(_scheduler: Arc<PollScheduler>, _shutdown: CancellationToken) {
    debug!("Sync-now signal is only available on Unix");
}

/// Turns every trigger into a scheduler sync request until shutdown
async fn forward_sync_requests<T: SyncTrigger>(
    scheduler: Arc<PollScheduler>,
    shutdown: CancellationToken,
    mut trigger: T,
) {
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            triggered = trigger.triggered() => {
                if !triggered {
                    debug!("Sync-now source closed");
                    break;
                }
                scheduler.request_sync();
            }
        }
    }
}
