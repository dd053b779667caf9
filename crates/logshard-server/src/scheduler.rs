//! Archival Background Task
//!
//! Runs the archival job on a fixed interval. The job itself already
//! isolates failures per month group and reports them; the scheduler only
//! logs the summary and keeps ticking - an archival failure never takes
//! the daemon down.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info};

use logshard_archive::Archiver;

/// Recurring archival trigger.
pub struct ArchiveScheduler {
    archiver: Arc<Archiver>,
    period: Duration,
    max_age_days: u32,
}

impl ArchiveScheduler {
    pub fn new(archiver: Arc<Archiver>, period: Duration, max_age_days: u32) -> Self {
        Self {
            archiver,
            period,
            max_age_days,
        }
    }

    /// Spawn the schedule loop. Returns the task handle and a shutdown
    /// sender; dropping or firing the sender stops the loop at the next
    /// tick.
    pub fn start(self) -> (JoinHandle<()>, oneshot::Sender<()>) {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(self.period);
            // The first tick of tokio's interval fires immediately; skip
            // it so startup is not also an archival run.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match self.archiver.archive(self.max_age_days).await {
                            Ok(report) => info!(
                                "scheduled archival: {} month(s) archived, {} failed",
                                report.archived(),
                                report.failed()
                            ),
                            Err(e) => error!("scheduled archival failed: {}", e),
                        }
                    }
                    _ = &mut shutdown_rx => {
                        info!("archive scheduler shutting down");
                        break;
                    }
                }
            }
        });
        (handle, shutdown_tx)
    }
}
