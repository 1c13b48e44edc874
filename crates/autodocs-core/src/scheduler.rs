//! Periodic polling of a [`RepoSync`].

use crate::{CoreError, PollOutcome, RepoSync};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Drives [`RepoSync::poll`] on a fixed period.
#[derive(Debug, Clone)]
pub struct Scheduler {
    period: Duration,
}

impl Scheduler {
    /// Create a scheduler. The period must be non-zero.
    pub fn new(period: Duration) -> Result<Self, CoreError> {
        if period.is_zero() {
            return Err(CoreError::InvalidConfig(
                "poll period must be non-zero".to_string(),
            ));
        }
        Ok(Self { period })
    }

    /// Poll period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Start polling in a background task.
    ///
    /// The first poll happens one period after start. Polls run inline in
    /// the loop, so a slow poll delays the next tick instead of overlapping.
    pub fn start(&self, sync: Arc<RepoSync>) -> SchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let period = self.period;

        let task = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            // First tick completes immediately
            ticker.tick().await;

            info!(period_secs = period.as_secs(), "Sync loop started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match sync.poll(Utc::now()).await {
                            PollOutcome::Rebuilt { revision } => {
                                info!(revision = %revision, "Index refreshed");
                            }
                            PollOutcome::Initialized { revision } => {
                                info!(revision = %revision, "Repository initialized");
                            }
                            outcome => debug!(?outcome, "Poll finished"),
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            info!("Sync loop stopped");
        });

        SchedulerHandle { shutdown_tx, task }
    }
}

/// Handle to a running sync loop.
#[derive(Debug)]
pub struct SchedulerHandle {
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the loop, waiting for a poll in flight to finish.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            warn!(error = %e, "Sync loop ended abnormally");
        }
    }
}
