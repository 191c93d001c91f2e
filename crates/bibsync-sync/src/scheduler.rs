//! Poll scheduler - drives sync cycles on a fixed interval
//!
//! The [`PollScheduler`] runs a caller-supplied sync cycle every
//! `poll_interval`, starting immediately. A "sync now" request starts the
//! next cycle without waiting for the timer. Cancelling the token stops the
//! loop; a cycle that is still in flight is dropped, so nothing is persisted
//! for the library it was working on.
//!
//! ```text
//! interval tick ──┐
//!                 ├──→ cycle() ──→ wait ──→ ...
//! request_sync ───┘
//! ```

use std::{
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Schedules periodic sync cycles
pub struct PollScheduler {
    poll_interval: Duration,
    /// Set by [`request_sync`](PollScheduler::request_sync), cleared when a cycle starts
    sync_requested: AtomicBool,
    wake: Notify,
    shutdown: CancellationToken,
}

impl PollScheduler {
    /// Creates a scheduler that stops when `shutdown` is cancelled
    ///
    /// Intervals below one second are raised to one second.
    pub fn new(poll_interval: Duration, shutdown: CancellationToken) -> Self {
        let poll_interval = poll_interval.max(Duration::from_secs(1));
        info!(
            poll_secs = poll_interval.as_secs(),
            "Creating poll scheduler"
        );

        Self {
            poll_interval,
            sync_requested: AtomicBool::new(false),
            wake: Notify::new(),
            shutdown,
        }
    }

    /// Requests an immediate sync cycle
    pub fn request_sync(&self) {
        info!("Sync requested (bypassing poll interval)");
        self.sync_requested.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    /// Returns whether a sync has been requested and not yet started
    pub fn is_sync_requested(&self) -> bool {
        self.sync_requested.load(Ordering::Acquire)
    }

    /// Runs `cycle` on every tick or request until shutdown
    ///
    /// The first cycle starts immediately. Ticks missed while a cycle runs
    /// are not replayed; the next one is scheduled a full interval later.
    ///
    /// # Returns
    /// The number of cycles that ran to completion
    pub async fn run<F, Fut>(&self, mut cycle: F) -> u64
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        info!("Poll scheduler starting");

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut completed: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = self.wake.notified() => debug!("Woken by sync request"),
                _ = ticker.tick() => debug!("Poll interval elapsed"),
            }

            self.sync_requested.store(false, Ordering::Release);

            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    warn!("Shutdown requested during sync cycle, abandoning it");
                    break;
                }
                _ = cycle() => {
                    completed += 1;
                    debug!(completed, "Sync cycle finished");
                }
            }
        }

        info!(completed, "Poll scheduler stopped");
        completed
    }
}
