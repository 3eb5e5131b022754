//! Wall-clock helpers.
//!
//! Timestamps are stored as a [`Duration`] since the Unix epoch. Peers carry
//! one in `last_announce` and swarms in `last_action`; the reaper compares
//! them against `now() - horizon`.
use std::time::{Duration, SystemTime};

/// A timestamp: the duration elapsed since the Unix epoch.
pub type DurationSinceUnixEpoch = Duration;

/// The current wall-clock time as a duration since the Unix epoch.
#[must_use]
pub fn now() -> DurationSinceUnixEpoch {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
}

/// `now()` minus the given duration, saturating at the epoch.
#[must_use]
pub fn now_sub(duration: &Duration) -> DurationSinceUnixEpoch {
    now().checked_sub(*duration).unwrap_or_default()
}
