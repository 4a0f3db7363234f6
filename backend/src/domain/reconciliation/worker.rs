//! Interval-driven background reconciliation.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::Reconciler;

/// Runs [`Reconciler::reconcile_pending`] on a fixed interval until shutdown.
pub struct ReconciliationWorker {
    reconciler: Arc<Reconciler>,
    interval: Duration,
}

impl ReconciliationWorker {
    /// Build a worker using the reconciler's configured interval.
    pub fn new(reconciler: Arc<Reconciler>) -> Self {
        let interval = reconciler.config().interval;
        Self {
            reconciler,
            interval,
        }
    }

    /// Override the pass interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Loop until `shutdown` carries `true` or its sender is dropped.
    ///
    /// The first pass runs immediately. Returns the number of passes started.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> u64 {
        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut passes = 0_u64;

        if *shutdown.borrow() {
            return passes;
        }

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    passes += 1;
                    if let Err(err) = self.reconciler.reconcile_pending().await {
                        warn!(pass = passes, error = %err, "reconciliation pass failed");
                    }
                }
            }
        }

        info!(passes, "reconciliation worker stopped");
        passes
    }
}
