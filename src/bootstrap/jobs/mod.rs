//! Long-lived jobs spawned at startup.
pub mod http_tracker;
pub mod peer_reaper;
pub mod tracker_apis;
