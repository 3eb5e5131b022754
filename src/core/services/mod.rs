//! Domain services on top of the core tracker.
//!
//! Services format tracker internals for external consumers (the admin API)
//! and wire up the statistics pipeline.
pub mod statistics;
pub mod torrent;

use crate::config::Configuration;
use crate::core::Tracker;

/// It builds a [`Tracker`] with an active statistics pipeline.
///
/// # Panics
///
/// Will panic if the configuration names an unknown backend driver. This runs
/// at startup only.
#[must_use]
pub fn tracker_factory(config: &Configuration) -> Tracker {
    let (stats_event_sender, stats_repository) = statistics::setup(config);

    match Tracker::new(config, stats_event_sender, stats_repository) {
        Ok(tracker) => tracker,
        Err(error) => {
            panic!("Failed to build the tracker: {error}")
        }
    }
}
