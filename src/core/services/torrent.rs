//! Torrent listing service, used by the admin API.
//!
//! It decouples the admin views from the in-memory layout of the peer store.
use serde::{Deserialize, Serialize};

use crate::core::Tracker;
use crate::shared::bit_torrent::info_hash::InfoHash;

/// Pagination for the torrent list endpoint.
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct Pagination {
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "Pagination::default_limit")]
    pub limit: u32,
}

impl Pagination {
    fn default_limit() -> u32 {
        4000
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: Self::default_limit(),
        }
    }
}

/// One row of the torrent list: aggregate counters only, no peers.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct BasicInfo {
    pub info_hash: InfoHash,
    pub seeders: u64,
    pub completed: u64,
    pub leechers: u64,
}

/// It lists swarms with their aggregate counters, ordered by infohash.
#[must_use]
pub fn get_torrents(tracker: &Tracker, pagination: &Pagination) -> Vec<BasicInfo> {
    let mut rows: Vec<BasicInfo> = Vec::new();

    for (info_hash, entry) in tracker.swarms.entries() {
        let Ok(swarm) = entry.lock() else { continue };
        let stats = swarm.metadata();
        rows.push(BasicInfo {
            info_hash,
            seeders: u64::from(stats.complete),
            completed: stats.downloaded,
            leechers: u64::from(stats.incomplete),
        });
    }

    rows.sort_by_key(|row| row.info_hash);

    rows.into_iter()
        .skip(pagination.offset as usize)
        .take(pagination.limit as usize)
        .collect()
}
