//! The background sweeper task.
//!
//! One task per engine, running the combined expiry + missed-heartbeat
//! sweep on the scheduler's cadence. The task owns nothing — it borrows
//! the engine through a clone and stamps each pass with the wall clock —
//! so shutting it down loses no state.

use std::time::SystemTime;

use lanyard_sweep::{SweepConfig, SweepScheduler};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::SessionEngine;

/// Handle to the running sweeper task.
///
/// Dropping the handle without calling [`shutdown`](Self::shutdown) aborts
/// nothing — the task keeps sweeping until the runtime stops. Keep the
/// handle for as long as the engine serves traffic.
pub struct SweeperHandle {
    shutdown_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stops the sweeper and waits for the in-flight pass to finish.
    pub async fn shutdown(self) {
        // The task may already be gone; either way it stops sweeping.
        let _ = self.shutdown_tx.send(());
        let _ = self.join.await;
    }
}

/// Spawns the periodic sweeper for an engine.
///
/// The default config sweeps every 60 seconds — intentionally independent
/// of any session's heartbeat interval, which only controls how many
/// sweep passes a session may miss before pausing.
pub fn spawn_sweeper(engine: SessionEngine, config: SweepConfig) -> SweeperHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        let mut scheduler = SweepScheduler::new(config);
        tracing::info!(
            interval_secs = scheduler.interval().as_secs(),
            "sweeper started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    tracing::info!(
                        passes = scheduler.pass_count(),
                        "sweeper shutting down"
                    );
                    break;
                }
                info = scheduler.wait_for_sweep() => {
                    let outcome = engine.sweep(SystemTime::now()).await;
                    if !outcome.is_quiet() {
                        tracing::info!(
                            pass = info.pass,
                            expired = outcome.expired.len(),
                            liveness_changed = outcome.liveness_changed.len(),
                            "sweep pass changed sessions"
                        );
                    }
                }
            }
        }
    });

    SweeperHandle { shutdown_tx, join }
}
