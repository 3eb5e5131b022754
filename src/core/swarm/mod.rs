//! A swarm is the set of peers sharing one torrent, partitioned into keyed
//! `seeders` and `leechers` sets. A peer id is a member of at most one of the
//! two sets at any time.
//!
//! All mutations run under the swarm's exclusive lock, owned by the
//! [`store`](crate::core::swarm::store); the methods here assume the caller
//! holds it.
pub mod store;

use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};

use crate::core::error::Error;
use crate::core::peer::{self, AnnounceEvent, Peer};
use crate::shared::clock::DurationSinceUnixEpoch;

/// Index metadata carried by swarms on private deployments.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct TorrentInfo {
    /// Id of the user that uploaded the torrent.
    #[serde(rename = "owner_user_id", default)]
    pub user_id: u64,
    /// Unix timestamp of the upload.
    #[serde(rename = "uploaded", default)]
    pub upload_date: i64,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "name", default)]
    pub torrent_name: String,
    #[serde(rename = "desc", default)]
    pub description: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A category of torrents on the index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TorrentCategory {
    pub id: i64,
    pub name: String,
    #[serde(rename = "desc")]
    pub description: String,
}

/// The aggregate counters a scrape reports for one swarm.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SwarmMetadata {
    /// Seeder count.
    pub complete: u32,
    /// Leecher count.
    pub incomplete: u32,
    /// Snatch count: completed downloads ever observed.
    pub downloaded: u64,
}

impl SwarmMetadata {
    #[must_use]
    pub fn zeroed() -> Self {
        Self::default()
    }
}

/// The peer-set transition an announce caused, mapped 1:1 onto the stats
/// peer events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PeerTransition {
    None,
    NewSeed,
    NewLeech,
    Completed,
    DeletedSeed,
    DeletedLeech,
}

/// What applying an announce to a swarm produced. The engine derives the
/// byte deltas from `previous` and the stats events from `transition`.
#[derive(Debug, PartialEq)]
pub struct AnnounceOutcome {
    /// The peer is new, or a known peer announced from a new address.
    pub created: bool,
    /// The leech→seed transition happened on this announce.
    pub snatched: bool,
    pub transition: PeerTransition,
    /// The record replaced or removed by this announce, if any.
    pub previous: Option<Peer>,
}

/// A swarm record: both peer sets plus the torrent-level bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct Swarm {
    pub id: u64,
    pub seeders: BTreeMap<peer::Id, Peer>,
    pub leechers: BTreeMap<peer::Id, Peer>,
    /// Completed downloads ever observed. Monotonically non-decreasing.
    pub snatches: u64,
    #[serde(rename = "upMultiplier")]
    pub up_multiplier: f64,
    #[serde(rename = "downMultiplier")]
    pub down_multiplier: f64,
    /// Timestamp of the most recent mutating announce.
    #[serde(rename = "lastAction", serialize_with = "peer::ser_unix_time_value")]
    pub last_action: DurationSinceUnixEpoch,
    pub info: Option<TorrentInfo>,
}

impl Swarm {
    #[must_use]
    pub fn new(id: u64, now: DurationSinceUnixEpoch) -> Self {
        Self {
            id,
            seeders: BTreeMap::new(),
            leechers: BTreeMap::new(),
            snatches: 0,
            up_multiplier: 1.0,
            down_multiplier: 1.0,
            last_action: now,
            info: None,
        }
    }

    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.seeders.len() + self.leechers.len()
    }

    #[must_use]
    pub fn metadata(&self) -> SwarmMetadata {
        #[allow(clippy::cast_possible_truncation)]
        SwarmMetadata {
            complete: self.seeders.len() as u32,
            incomplete: self.leechers.len() as u32,
            downloaded: self.snatches,
        }
    }

    /// It applies one announce to the peer sets.
    ///
    /// The transition table is total over `(prior state, event)`. `strict`
    /// turns a `stopped` from an unknown peer into a failure instead of a
    /// no-op.
    ///
    /// # Errors
    ///
    /// Will return [`Error::BadRequest`] for a strict `stopped` on an absent
    /// peer.
    pub fn apply(&mut self, peer: Peer, event: AnnounceEvent, strict: bool) -> Result<AnnounceOutcome, Error> {
        self.last_action = peer.updated;

        match event {
            AnnounceEvent::Stopped => self.remove(&peer, strict),
            AnnounceEvent::Completed => Ok(self.complete(peer)),
            AnnounceEvent::Started | AnnounceEvent::None => Ok(self.upsert(peer)),
        }
    }

    fn remove(&mut self, peer: &Peer, strict: bool) -> Result<AnnounceOutcome, Error> {
        if let Some(previous) = self.seeders.remove(&peer.peer_id) {
            return Ok(AnnounceOutcome {
                created: false,
                snatched: false,
                transition: PeerTransition::DeletedSeed,
                previous: Some(previous),
            });
        }

        if let Some(previous) = self.leechers.remove(&peer.peer_id) {
            return Ok(AnnounceOutcome {
                created: false,
                snatched: false,
                transition: PeerTransition::DeletedLeech,
                previous: Some(previous),
            });
        }

        if strict {
            return Err(Error::BadRequest);
        }

        Ok(AnnounceOutcome {
            created: false,
            snatched: false,
            transition: PeerTransition::None,
            previous: None,
        })
    }

    fn complete(&mut self, peer: Peer) -> AnnounceOutcome {
        if let Some(previous) = self.seeders.insert(peer.peer_id, peer) {
            // A seeder re-announcing `completed` is idempotent: no re-count.
            return AnnounceOutcome {
                created: previous.endpoint != peer.endpoint,
                snatched: false,
                transition: PeerTransition::None,
                previous: Some(previous),
            };
        }

        if let Some(previous) = self.leechers.remove(&peer.peer_id) {
            self.snatches += 1;
            return AnnounceOutcome {
                created: previous.endpoint != peer.endpoint,
                snatched: true,
                transition: PeerTransition::Completed,
                previous: Some(previous),
            };
        }

        // Unknown peer announcing `completed`: it joins directly as a seed
        // and the download still counts.
        self.snatches += 1;
        AnnounceOutcome {
            created: true,
            snatched: true,
            transition: PeerTransition::NewSeed,
            previous: None,
        }
    }

    fn upsert(&mut self, peer: Peer) -> AnnounceOutcome {
        if self.seeders.contains_key(&peer.peer_id) {
            let previous = self.seeders.insert(peer.peer_id, peer);
            return AnnounceOutcome {
                created: previous.is_some_and(|p| p.endpoint != peer.endpoint),
                snatched: false,
                transition: PeerTransition::None,
                previous,
            };
        }

        if let Some(previous) = self.leechers.remove(&peer.peer_id) {
            // A leecher reporting `left == 0` finished without sending
            // `completed`; the transition is counted all the same.
            if peer.is_seeder() {
                self.seeders.insert(peer.peer_id, peer);
                self.snatches += 1;
                return AnnounceOutcome {
                    created: previous.endpoint != peer.endpoint,
                    snatched: true,
                    transition: PeerTransition::Completed,
                    previous: Some(previous),
                };
            }

            self.leechers.insert(peer.peer_id, peer);
            return AnnounceOutcome {
                created: previous.endpoint != peer.endpoint,
                snatched: false,
                transition: PeerTransition::None,
                previous: Some(previous),
            };
        }

        let transition = if peer.is_seeder() {
            self.seeders.insert(peer.peer_id, peer);
            PeerTransition::NewSeed
        } else {
            self.leechers.insert(peer.peer_id, peer);
            PeerTransition::NewLeech
        };

        AnnounceOutcome {
            created: true,
            snatched: false,
            transition,
            previous: None,
        }
    }

    /// It selects up to `numwant` peers for a response, excluding the
    /// requester.
    ///
    /// Seeders and leechers contribute in rough proportion to their counts;
    /// within each set the picks are randomized and never repeat. When the
    /// swarm holds fewer peers than requested, all of them come back, seeders
    /// first.
    #[must_use]
    pub fn select_peers(&self, exclude: &peer::Id, numwant: usize) -> Vec<Peer> {
        let seeders: Vec<&Peer> = self.seeders.values().filter(|p| p.peer_id != *exclude).collect();
        let leechers: Vec<&Peer> = self.leechers.values().filter(|p| p.peer_id != *exclude).collect();

        let available = seeders.len() + leechers.len();
        if available <= numwant {
            return seeders.into_iter().chain(leechers).copied().collect();
        }

        let mut wanted_seeders = numwant * seeders.len() / available;
        let mut wanted_leechers = numwant - wanted_seeders;

        // Proportional shares can undershoot a set; backfill from the other.
        if wanted_seeders > seeders.len() {
            wanted_leechers += wanted_seeders - seeders.len();
            wanted_seeders = seeders.len();
        }
        if wanted_leechers > leechers.len() {
            wanted_seeders = (wanted_seeders + wanted_leechers - leechers.len()).min(seeders.len());
            wanted_leechers = leechers.len();
        }

        let mut rng = thread_rng();

        let mut peers: Vec<Peer> = seeders
            .choose_multiple(&mut rng, wanted_seeders)
            .chain(leechers.choose_multiple(&mut rng, wanted_leechers))
            .copied()
            .copied()
            .collect();
        peers.truncate(numwant);
        peers
    }

    /// It removes every peer whose last announce is older than the cutoff and
    /// returns the removed records with a was-seeder flag.
    pub fn remove_stale_peers(&mut self, cutoff: DurationSinceUnixEpoch) -> Vec<(Peer, bool)> {
        let mut reaped: Vec<(Peer, bool)> = Vec::new();

        self.seeders.retain(|_, peer| {
            if peer.updated < cutoff {
                reaped.push((*peer, true));
                return false;
            }
            true
        });
        self.leechers.retain(|_, peer| {
            if peer.updated < cutoff {
                reaped.push((*peer, false));
                return false;
            }
            true
        });

        reaped
    }
}

#[cfg(test)]
mod tests {

    mod the_swarm {
        use std::net::{IpAddr, Ipv4Addr};
        use std::time::Duration;

        use crate::core::peer::fixture::PeerBuilder;
        use crate::core::peer::{AnnounceEvent, Id, PeerAddr, PeerEndpoint};
        use crate::core::swarm::{PeerTransition, Swarm};
        use crate::shared::clock;

        fn swarm() -> Swarm {
            Swarm::new(1, clock::now())
        }

        fn seeder_id() -> Id {
            Id(*b"-qB00000000000000001")
        }

        fn leecher_id() -> Id {
            Id(*b"-qB00000000000000002")
        }

        #[test]
        fn it_should_insert_an_unknown_seeder_into_the_seeders_set() {
            let mut swarm = swarm();

            let outcome = swarm
                .apply(PeerBuilder::seeder().build(), AnnounceEvent::Started, false)
                .unwrap();

            assert!(outcome.created);
            assert_eq!(outcome.transition, PeerTransition::NewSeed);
            assert_eq!(swarm.seeders.len(), 1);
            assert_eq!(swarm.leechers.len(), 0);
        }

        #[test]
        fn it_should_insert_an_unknown_leecher_into_the_leechers_set() {
            let mut swarm = swarm();

            let outcome = swarm
                .apply(PeerBuilder::leecher().build(), AnnounceEvent::Started, false)
                .unwrap();

            assert!(outcome.created);
            assert_eq!(outcome.transition, PeerTransition::NewLeech);
            assert_eq!(swarm.leechers.len(), 1);
        }

        #[test]
        fn it_should_keep_a_peer_id_in_at_most_one_of_the_two_sets() {
            let mut swarm = swarm();
            let id = leecher_id();

            let events = [
                (AnnounceEvent::Started, 1000),
                (AnnounceEvent::None, 500),
                (AnnounceEvent::Completed, 0),
                (AnnounceEvent::None, 0),
                (AnnounceEvent::Started, 0),
            ];

            for (event, left) in events {
                let peer = PeerBuilder::default().with_peer_id(&id).with_left(left).build();
                swarm.apply(peer, event, false).unwrap();

                let in_seeders = swarm.seeders.contains_key(&id);
                let in_leechers = swarm.leechers.contains_key(&id);
                assert!(!(in_seeders && in_leechers));
            }
        }

        #[test]
        fn it_should_move_a_completing_leecher_to_the_seeders_and_count_the_snatch() {
            let mut swarm = swarm();
            let id = leecher_id();

            let leecher = PeerBuilder::default().with_peer_id(&id).with_left(1000).build();
            swarm.apply(leecher, AnnounceEvent::Started, false).unwrap();

            let completed = PeerBuilder::default().with_peer_id(&id).with_left(0).build();
            let outcome = swarm.apply(completed, AnnounceEvent::Completed, false).unwrap();

            assert!(outcome.snatched);
            assert_eq!(outcome.transition, PeerTransition::Completed);
            assert_eq!(swarm.snatches, 1);
            assert!(swarm.seeders.contains_key(&id));
            assert!(!swarm.leechers.contains_key(&id));
        }

        #[test]
        fn it_should_not_recount_a_snatch_for_a_repeated_completed() {
            let mut swarm = swarm();
            let id = leecher_id();

            let leecher = PeerBuilder::default().with_peer_id(&id).with_left(1000).build();
            swarm.apply(leecher, AnnounceEvent::Started, false).unwrap();

            let completed = PeerBuilder::default().with_peer_id(&id).with_left(0).build();
            swarm.apply(completed, AnnounceEvent::Completed, false).unwrap();
            let outcome = swarm.apply(completed, AnnounceEvent::Completed, false).unwrap();

            assert!(!outcome.snatched);
            assert_eq!(outcome.transition, PeerTransition::None);
            assert_eq!(swarm.snatches, 1);
        }

        #[test]
        fn it_should_count_a_snatch_for_an_implicit_left_zero_update() {
            let mut swarm = swarm();
            let id = leecher_id();

            let leecher = PeerBuilder::default().with_peer_id(&id).with_left(1000).build();
            swarm.apply(leecher, AnnounceEvent::Started, false).unwrap();

            let finished = PeerBuilder::default().with_peer_id(&id).with_left(0).build();
            let outcome = swarm.apply(finished, AnnounceEvent::None, false).unwrap();

            assert!(outcome.snatched);
            assert_eq!(swarm.snatches, 1);
            assert!(swarm.seeders.contains_key(&id));
        }

        #[test]
        fn it_should_count_a_snatch_for_a_completed_from_an_unknown_peer() {
            let mut swarm = swarm();

            let peer = PeerBuilder::seeder().build();
            let outcome = swarm.apply(peer, AnnounceEvent::Completed, false).unwrap();

            assert!(outcome.created);
            assert!(outcome.snatched);
            assert_eq!(outcome.transition, PeerTransition::NewSeed);
            assert_eq!(swarm.snatches, 1);
        }

        #[test]
        fn it_should_remove_a_stopped_peer() {
            let mut swarm = swarm();

            let peer = PeerBuilder::seeder().build();
            swarm.apply(peer, AnnounceEvent::Started, false).unwrap();
            let count_before = swarm.peer_count();

            let outcome = swarm.apply(peer, AnnounceEvent::Stopped, false).unwrap();

            assert_eq!(outcome.transition, PeerTransition::DeletedSeed);
            assert_eq!(swarm.peer_count(), count_before - 1);
        }

        #[test]
        fn it_should_ignore_a_stopped_announce_from_an_unknown_peer() {
            let mut swarm = swarm();

            let outcome = swarm
                .apply(PeerBuilder::seeder().build(), AnnounceEvent::Stopped, false)
                .unwrap();

            assert_eq!(outcome.transition, PeerTransition::None);
            assert!(outcome.previous.is_none());
        }

        #[test]
        fn it_should_fail_a_strict_stopped_announce_from_an_unknown_peer() {
            let mut swarm = swarm();

            let result = swarm.apply(PeerBuilder::seeder().build(), AnnounceEvent::Stopped, true);

            assert!(result.is_err());
        }

        #[test]
        fn it_should_flag_an_address_change_as_created() {
            let mut swarm = swarm();
            let id = seeder_id();

            let peer = PeerBuilder::default().with_peer_id(&id).build();
            swarm.apply(peer, AnnounceEvent::Started, false).unwrap();

            let moved = PeerBuilder::default()
                .with_peer_id(&id)
                .with_endpoint(&PeerEndpoint {
                    addr: PeerAddr::Ip(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 9))),
                    port: 7070,
                })
                .build();
            let outcome = swarm.apply(moved, AnnounceEvent::None, false).unwrap();

            assert!(outcome.created);
        }

        #[test]
        fn it_should_never_decrease_the_snatch_counter() {
            let mut swarm = swarm();
            let id = leecher_id();
            let mut last = 0;

            let sequence = [
                (AnnounceEvent::Started, 1000),
                (AnnounceEvent::Completed, 0),
                (AnnounceEvent::Stopped, 0),
                (AnnounceEvent::Completed, 0),
                (AnnounceEvent::Stopped, 0),
            ];

            for (event, left) in sequence {
                let peer = PeerBuilder::default().with_peer_id(&id).with_left(left).build();
                swarm.apply(peer, event, false).unwrap();
                assert!(swarm.snatches >= last);
                last = swarm.snatches;
            }
        }

        #[test]
        fn it_should_remove_peers_older_than_the_cutoff() {
            let mut swarm = swarm();
            let now = clock::now();

            let stale = PeerBuilder::seeder().last_updated_on(now - Duration::from_secs(7200)).build();
            let fresh = PeerBuilder::leecher().last_updated_on(now).build();
            swarm.apply(stale, AnnounceEvent::Started, false).unwrap();
            swarm.apply(fresh, AnnounceEvent::Started, false).unwrap();

            let reaped = swarm.remove_stale_peers(now - Duration::from_secs(3600));

            assert_eq!(reaped.len(), 1);
            assert!(reaped[0].1, "the reaped peer was a seeder");
            assert_eq!(swarm.peer_count(), 1);
        }
    }

    mod peer_selection {
        use crate::core::peer::fixture::PeerBuilder;
        use crate::core::peer::{AnnounceEvent, Id};
        use crate::core::swarm::Swarm;
        use crate::shared::clock;

        fn populated_swarm(seeders: u8, leechers: u8) -> Swarm {
            let mut swarm = Swarm::new(1, clock::now());
            for i in 0..seeders {
                let peer = PeerBuilder::default()
                    .with_peer_id(&id_from(b'S', i))
                    .with_left(0)
                    .build();
                swarm.apply(peer, AnnounceEvent::Started, false).unwrap();
            }
            for i in 0..leechers {
                let peer = PeerBuilder::default()
                    .with_peer_id(&id_from(b'L', i))
                    .with_left(1000)
                    .build();
                swarm.apply(peer, AnnounceEvent::Started, false).unwrap();
            }
            swarm
        }

        fn id_from(class: u8, i: u8) -> Id {
            let mut bytes = [b'0'; 20];
            bytes[0] = class;
            bytes[1] = i;
            Id(bytes)
        }

        #[test]
        fn it_should_return_all_peers_when_fewer_than_numwant_exist() {
            let swarm = populated_swarm(2, 3);

            let peers = swarm.select_peers(&id_from(b'X', 0), 50);

            assert_eq!(peers.len(), 5);
            // Seeders first on the short path.
            assert!(peers[0].is_seeder() && peers[1].is_seeder());
        }

        #[test]
        fn it_should_exclude_the_requester() {
            let swarm = populated_swarm(2, 2);

            let peers = swarm.select_peers(&id_from(b'S', 0), 50);

            assert!(peers.iter().all(|p| p.peer_id != id_from(b'S', 0)));
            assert_eq!(peers.len(), 3);
        }

        #[test]
        fn it_should_not_return_more_than_numwant_peers() {
            let swarm = populated_swarm(40, 60);

            let peers = swarm.select_peers(&id_from(b'X', 0), 10);

            assert_eq!(peers.len(), 10);
        }

        #[test]
        fn it_should_never_repeat_a_peer_within_a_response() {
            let swarm = populated_swarm(30, 30);

            let peers = swarm.select_peers(&id_from(b'X', 0), 20);

            let mut ids: Vec<_> = peers.iter().map(|p| p.peer_id).collect();
            ids.sort();
            ids.dedup();
            assert_eq!(ids.len(), peers.len());
        }

        #[test]
        fn it_should_mix_seeders_and_leechers_roughly_proportionally() {
            let swarm = populated_swarm(50, 50);

            let peers = swarm.select_peers(&id_from(b'X', 0), 10);

            let seeders = peers.iter().filter(|p| p.is_seeder()).count();
            assert_eq!(seeders, 5);
        }
    }
}
