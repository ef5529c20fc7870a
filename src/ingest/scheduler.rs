// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::Watcher;

#[derive(Clone, Copy, Debug)]
pub struct SchedulerCfg {
    pub interval: Duration,
}

/// Run the watcher now and then every `cfg.interval`, forever. A failed tick is logged
/// and the loop carries on; stop it by aborting the handle.
pub fn spawn_scheduler(watcher: Arc<Watcher>, cfg: SchedulerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cfg.interval);
        // A slow run should not be followed by a burst of catch-up runs.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match watcher.run().await {
                Ok(outcome) => tracing::info!(
                    target: "watch",
                    new = outcome.new_items.len(),
                    next_in_secs = cfg.interval.as_secs(),
                    "scheduled tick done"
                ),
                Err(e) => tracing::error!(target: "watch", error = ?e, "scheduled tick failed"),
            }
        }
    })
}
