//! Background expiry sweeper.
//!
//! Periodically persists `expired` on pending invitations past their
//! expiry. Redemption never depends on the sweeper having run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::error::AuthzResult;
use crate::invitation::InvitationService;

/// Periodic invitation expiry.
#[derive(Clone)]
pub struct ExpirySweeper {
    invitations: InvitationService,
    period: Duration,
}

impl ExpirySweeper {
    /// Sweep with `invitations` every `period`.
    pub fn new(invitations: InvitationService, period: Duration) -> Self {
        Self {
            invitations,
            period,
        }
    }

    /// Interval between sweeps.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run a single sweep.
    ///
    /// # Returns
    ///
    /// Number of invitations expired
    pub async fn sweep_once(&self) -> AuthzResult<usize> {
        self.invitations.expire_stale().await
    }

    /// Spawn the sweep loop on the current runtime.
    ///
    /// The first sweep runs immediately. A failed sweep is logged and the
    /// loop keeps going.
    pub fn start(self) -> SweeperHandle {
        let running = Arc::new(AtomicBool::new(true));
        let flag = running.clone();

        tracing::info!(period_secs = self.period.as_secs(), "Starting invitation sweeper");
        let handle = tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            while flag.load(Ordering::Acquire) {
                ticker.tick().await;
                match self.sweep_once().await {
                    Ok(0) => tracing::debug!("Invitation sweep found nothing to expire"),
                    Ok(count) => tracing::info!(count, "Invitation sweep complete"),
                    Err(e) => tracing::error!(error = %e, "Invitation sweep failed"),
                }
            }
        });

        SweeperHandle { running, handle }
    }
}

/// Handle to a running sweeper task.
pub struct SweeperHandle {
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl SweeperHandle {
    /// Check if the sweep loop is still alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && !self.handle.is_finished()
    }

    /// Stop the sweep loop and wait for the task to end.
    ///
    /// # Returns
    ///
    /// `false` if the task had already died from a panic
    pub async fn shutdown(self) -> bool {
        self.running.store(false, Ordering::Release);
        self.handle.abort();
        match self.handle.await {
            Err(e) if !e.is_cancelled() => {
                tracing::error!(error = %e, "Invitation sweeper task failed");
                false
            }
            _ => {
                tracing::info!("Invitation sweeper stopped");
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthzEngine, AuthzConfig, MemoryStore};

    #[tokio::test]
    async fn test_sweep_once_on_empty_store() {
        let engine = AuthzEngine::in_memory();
        let sweeper = engine.sweeper();
        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
        assert_eq!(sweeper.period(), AuthzConfig::default().sweep_interval());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_and_shutdown() {
        let engine = AuthzEngine::builder(Arc::new(MemoryStore::new()))
            .config(AuthzConfig::default().with_sweep_interval_secs(1))
            .build()
            .unwrap();
        let handle = engine.sweeper().start();
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(handle.is_running());
        assert!(handle.shutdown().await);
    }

    #[tokio::test]
    async fn test_shutdown_reports_panicked_task() {
        let handle = SweeperHandle {
            running: Arc::new(AtomicBool::new(true)),
            handle: tokio::spawn(async { panic!("sweep failed") }),
        };
        while !handle.handle.is_finished() {
            tokio::task::yield_now().await;
        }
        assert!(!handle.is_running());
        assert!(!handle.shutdown().await);
    }
}
