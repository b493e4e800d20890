//! Background expiry of overdue review requests.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::queue::ReviewQueue;

// ─────────────────────────────────────────────────────────────────────────────
// Expiry Sweeper
// ─────────────────────────────────────────────────────────────────────────────

/// Periodically times out overdue requests and prunes old completed ones.
///
/// Waiters whose request is expired by the sweeper are woken through the
/// queue's completion notification and report `TimedOut`.
#[derive(Debug)]
pub struct ExpirySweeper {
    queue: Arc<ReviewQueue>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ExpirySweeper {
    #[must_use]
    pub fn new(queue: Arc<ReviewQueue>, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            queue,
            interval,
            shutdown,
        }
    }

    /// Spawns [`run`](Self::run) on the current runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs one expiry and retention pass.
    ///
    /// Returns `(expired, pruned)`.
    pub fn sweep_once(&self) -> (usize, usize) {
        let expired = self.queue.cleanup_expired().len();
        let pruned = self.queue.cleanup_completed();
        if expired > 0 || pruned > 0 {
            debug!(expired, pruned, "Review sweep");
        }
        (expired, pruned)
    }

    /// Sweeps on every interval tick until the shutdown token fires.
    ///
    /// A last sweep runs on shutdown so no overdue request is left pending.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // First tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                biased;
                () = self.shutdown.cancelled() => {
                    let (expired, _) = self.sweep_once();
                    info!(expired, "Expiry sweeper stopped");
                    break;
                }
                _ = interval.tick() => {
                    self.sweep_once();
                }
            }
        }
    }
}
