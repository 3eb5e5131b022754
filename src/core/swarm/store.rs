//! The peer store: a sharded mapping from infohash to swarm.
//!
//! Swarms are partitioned by a hash of the infohash into a configurable
//! number of shards, each guarded by its own reader/writer lock, so announces
//! on different infohashes never contend. The swarm itself carries an
//! exclusive lock for multi-step mutations; no caller ever holds more than
//! one swarm lock at a time.
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use serde::Serialize;

use crate::core::peer;
use crate::core::swarm::{Swarm, SwarmMetadata};
use crate::shared::bit_torrent::info_hash::InfoHash;
use crate::shared::clock::{self, DurationSinceUnixEpoch};

const DEFAULT_SHARD_COUNT: usize = 1;

/// Store-wide aggregate counters, used by the admin API.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StoreMetrics {
    pub torrents: u64,
    pub complete: u64,
    pub incomplete: u64,
    pub downloaded: u64,
}

type Shard = RwLock<HashMap<InfoHash, Arc<Mutex<Swarm>>>>;

pub struct SwarmStore {
    shards: Vec<Shard>,
    next_torrent_id: AtomicU64,
}

impl Default for SwarmStore {
    fn default() -> Self {
        Self::new(DEFAULT_SHARD_COUNT)
    }
}

impl SwarmStore {
    /// It builds a store with the given number of shards (at least one).
    #[must_use]
    pub fn new(shard_count: usize) -> Self {
        let shard_count = shard_count.max(1);
        let mut shards = Vec::with_capacity(shard_count);
        for _ in 0..shard_count {
            shards.push(RwLock::new(HashMap::new()));
        }
        Self {
            shards,
            next_torrent_id: AtomicU64::new(1),
        }
    }

    fn shard_for(&self, info_hash: &InfoHash) -> &Shard {
        let mut hasher = DefaultHasher::new();
        info_hash.hash(&mut hasher);
        #[allow(clippy::cast_possible_truncation)]
        let index = (hasher.finish() % self.shards.len() as u64) as usize;
        &self.shards[index]
    }

    /// It locates a swarm.
    #[must_use]
    pub fn find(&self, info_hash: &InfoHash) -> Option<Arc<Mutex<Swarm>>> {
        self.shard_for(info_hash)
            .read()
            .expect("shard lock poisoned")
            .get(info_hash)
            .cloned()
    }

    /// It runs `mutator` on the swarm under its exclusive lock, creating the
    /// swarm first when `create` is set.
    ///
    /// Returns `None` when the swarm does not exist and creation was not
    /// requested; otherwise the mutator result plus whether this call created
    /// the swarm.
    pub fn touch<T>(&self, info_hash: &InfoHash, create: bool, mutator: impl FnOnce(&mut Swarm) -> T) -> Option<(T, bool)> {
        let (entry, created) = match self.find(info_hash) {
            Some(entry) => (entry, false),
            None if create => self.find_or_create(info_hash),
            None => return None,
        };

        let mut swarm = entry.lock().expect("swarm lock poisoned");
        Some((mutator(&mut swarm), created))
    }

    fn find_or_create(&self, info_hash: &InfoHash) -> (Arc<Mutex<Swarm>>, bool) {
        let mut shard = self.shard_for(info_hash).write().expect("shard lock poisoned");
        match shard.get(info_hash) {
            // Lost the race against a concurrent creator.
            Some(entry) => (entry.clone(), false),
            None => {
                let id = self.next_torrent_id.fetch_add(1, Ordering::Relaxed);
                let entry = Arc::new(Mutex::new(Swarm::new(id, clock::now())));
                shard.insert(*info_hash, entry.clone());
                (entry, true)
            }
        }
    }

    /// It inserts a swarm built elsewhere, e.g. by the admin API. An existing
    /// swarm for the infohash is replaced.
    pub fn insert(&self, info_hash: InfoHash, mut swarm: Swarm) {
        if swarm.id == 0 {
            swarm.id = self.next_torrent_id.fetch_add(1, Ordering::Relaxed);
        }
        self.shard_for(&info_hash)
            .write()
            .expect("shard lock poisoned")
            .insert(info_hash, Arc::new(Mutex::new(swarm)));
    }

    /// It deletes a swarm and all peers in it, returning the removed entry.
    pub fn purge(&self, info_hash: &InfoHash) -> Option<Arc<Mutex<Swarm>>> {
        self.shard_for(info_hash)
            .write()
            .expect("shard lock poisoned")
            .remove(info_hash)
    }

    /// It walks the store and yields the key of every peer whose last
    /// announce is older than the cutoff.
    ///
    /// Shards are visited one at a time and only briefly read-locked; swarm
    /// locks are taken one by one, so serving never pauses globally.
    #[must_use]
    pub fn iter_stale(&self, cutoff: DurationSinceUnixEpoch) -> Vec<(InfoHash, peer::Id)> {
        let mut stale = Vec::new();

        for shard in &self.shards {
            let entries: Vec<(InfoHash, Arc<Mutex<Swarm>>)> = shard
                .read()
                .expect("shard lock poisoned")
                .iter()
                .map(|(info_hash, entry)| (*info_hash, entry.clone()))
                .collect();

            for (info_hash, entry) in entries {
                let swarm = entry.lock().expect("swarm lock poisoned");
                for peer in swarm.seeders.values().chain(swarm.leechers.values()) {
                    if peer.updated < cutoff {
                        stale.push((info_hash, peer.peer_id));
                    }
                }
            }
        }

        stale
    }

    /// All swarms, one shard at a time. Used by the reaper's empty-swarm scan.
    #[must_use]
    pub fn entries(&self) -> Vec<(InfoHash, Arc<Mutex<Swarm>>)> {
        let mut all = Vec::new();
        for shard in &self.shards {
            let shard = shard.read().expect("shard lock poisoned");
            all.extend(shard.iter().map(|(info_hash, entry)| (*info_hash, entry.clone())));
        }
        all
    }

    /// It aggregates the per-swarm counters for the stats endpoint.
    #[must_use]
    pub fn metrics(&self) -> StoreMetrics {
        let mut metrics = StoreMetrics::default();

        for (_, entry) in self.entries() {
            let stats: SwarmMetadata = entry.lock().expect("swarm lock poisoned").metadata();
            metrics.torrents += 1;
            metrics.complete += u64::from(stats.complete);
            metrics.incomplete += u64::from(stats.incomplete);
            metrics.downloaded += stats.downloaded;
        }

        metrics
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| shard.read().expect("shard lock poisoned").len())
            .sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
