//! The tracker application: it spawns the jobs the configuration enables.
//!
//! Jobs:
//!
//! - HTTP tracker (always): announce and scrape over the selected transport.
//! - Admin API (optional): operational state and registry management.
//! - Peer reaper (always): stale-peer eviction and inactive-swarm purging.
use anyhow::Context;
use tokio::task::JoinHandle;

use crate::bootstrap::app::App;
use crate::bootstrap::jobs::{http_tracker, peer_reaper, tracker_apis};

/// It starts all enabled jobs and returns their handles.
///
/// # Errors
///
/// Will return an error if a listener cannot be bound.
pub async fn start(app: &App) -> anyhow::Result<Vec<JoinHandle<()>>> {
    let mut jobs: Vec<JoinHandle<()>> = Vec::new();

    jobs.push(
        http_tracker::start_job(
            &app.config.http_tracker,
            app.tracker.clone(),
            app.network.clone(),
            app.config.core.real_ip_header.clone(),
        )
        .await
        .context("cannot start the HTTP tracker")?,
    );

    if app.config.http_api.enabled {
        jobs.push(
            tracker_apis::start_job(&app.config.http_api, app.tracker.clone())
                .await
                .context("cannot start the admin API")?,
        );
    }

    if app.config.core.reap_interval > 0 {
        jobs.push(peer_reaper::start_job(&app.config.core, &app.tracker));
    }

    Ok(jobs)
}
