//! Job that runs the reaper on intervals.
//!
//! Each pass evicts peers whose last announce is older than
//! `reapInterval * reapRatio` and, when `purgeInactiveTorrents` is set,
//! deletes swarms that are empty and inactive.
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::config::Core;
use crate::core;

/// It starts the reaper job, waking up every `reapInterval` seconds.
#[must_use]
pub fn start_job(config: &Core, tracker: &Arc<core::Tracker>) -> JoinHandle<()> {
    let weak_tracker = std::sync::Arc::downgrade(tracker);
    let interval = config.reap_interval;

    tokio::spawn(async move {
        let interval = Duration::from_secs(interval.max(1));
        let mut interval = tokio::time::interval(interval);
        interval.tick().await;

        loop {
            tokio::select! {
                () = shutdown_signal() => {
                    log::info!("Stopping peer reaper job..");
                    break;
                }
                _ = interval.tick() => {
                    if let Some(tracker) = weak_tracker.upgrade() {
                        let start_time = Utc::now().time();
                        log::debug!("Reaping stale peers..");
                        tracker.reap().await;
                        log::debug!("Reaped stale peers in: {}ms", (Utc::now().time() - start_time).num_milliseconds());
                    } else {
                        break;
                    }
                }
            }
        }
    })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
