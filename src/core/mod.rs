//! The core tracker module contains the generic `BitTorrent` tracker logic
//! which is independent of the delivery layer.
//!
//! The [`Tracker`] handles the `announce` and `scrape` requests:
//!
//! - **Announce**: a peer reports its state and gets back a subset of the
//!   swarm. The peer store is mutated under the swarm's exclusive lock, the
//!   byte delta is computed against the replaced record and handed to the
//!   backend driver, and stats events are emitted.
//! - **Scrape**: seed/leech/snatch counters for a batch of infohashes.
//!   Unknown infohashes are omitted from the response, never failed.
//!
//! The tracker is also a container for its collaborators: the sharded
//! [`swarm::store::SwarmStore`], the [`whitelist::ClientWhitelist`], the
//! in-memory [`auth::UserRegistry`], the optional [`backends::Backend`]
//! driver and the [`statistics`] event sender.
//!
//! No handler ever holds more than one swarm lock at a time, and nothing
//! blocks on the backend while holding one.
pub mod auth;
pub mod backends;
pub mod error;
pub mod peer;
pub mod services;
pub mod statistics;
pub mod swarm;
pub mod whitelist;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, warn};
use tokio::sync::mpsc::error::SendError;

use self::auth::{Passkey, User, UserRegistry};
use self::backends::{AnnounceDelta, Backend, BackendTorrent};
use self::error::Error;
use self::peer::{AnnounceEvent, Peer, PeerEndpoint};
use self::swarm::store::SwarmStore;
use self::swarm::{PeerTransition, Swarm, SwarmMetadata, TorrentInfo};
use self::whitelist::{ClientId, ClientWhitelist};
use crate::config::{AnnouncePolicy, Configuration, Core, TORRENT_PEERS_LIMIT};
use crate::shared::bit_torrent::info_hash::InfoHash;
use crate::shared::clock;

/// An announce request, already parsed and address-resolved by a delivery
/// adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct Announce {
    pub info_hash: InfoHash,
    pub peer_id: peer::Id,
    /// The peer's transport address as derived by the network transport, plus
    /// the port it announced.
    pub endpoint: PeerEndpoint,
    pub uploaded: u64,
    pub downloaded: u64,
    pub left: u64,
    pub event: AnnounceEvent,
    pub numwant: Option<u32>,
    pub compact: bool,
    pub passkey: Option<Passkey>,
}

/// Structure that holds the data returned by the `announce` request.
#[derive(Debug, PartialEq)]
pub struct AnnounceData {
    /// Peers sharing the torrent, excluding the requester.
    pub peers: Vec<Peer>,
    /// Post-mutation swarm counters.
    pub stats: SwarmMetadata,
    pub policy: AnnouncePolicy,
    /// Echo of the request's compact flag, for the adapter.
    pub compact: bool,
}

/// A scrape request.
#[derive(Debug, Clone, PartialEq)]
pub struct Scrape {
    pub passkey: Option<Passkey>,
    pub info_hashes: Vec<InfoHash>,
}

/// Structure that holds the data returned by the `scrape` request.
#[derive(Debug, PartialEq, Default)]
pub struct ScrapeData {
    /// A map of infohashes and swarm metadata for each resolved torrent.
    pub files: HashMap<InfoHash, SwarmMetadata>,
}

impl ScrapeData {
    /// Creates a new empty `ScrapeData` with no files (torrents).
    #[must_use]
    pub fn empty() -> Self {
        Self { files: HashMap::new() }
    }

    /// Adds a torrent to the `ScrapeData`.
    pub fn add_file(&mut self, info_hash: &InfoHash, metadata: SwarmMetadata) {
        self.files.insert(*info_hash, metadata);
    }
}

/// A swarm snapshot with its infohash, served by the admin API.
#[derive(Debug, serde::Serialize)]
pub struct TorrentSnapshot {
    pub infohash: InfoHash,
    #[serde(flatten)]
    pub swarm: Swarm,
}

/// The domain layer tracker service.
pub struct Tracker {
    config: Core,
    policy: AnnouncePolicy,
    pub swarms: SwarmStore,
    pub users: UserRegistry,
    pub whitelist: ClientWhitelist,
    /// The backend driver. The default `noop` driver keeps public trackers
    /// free of persistence.
    backend: Arc<Box<dyn Backend>>,
    stats_event_sender: Option<Box<dyn statistics::EventSender>>,
    stats_repository: statistics::Repo,
}

impl Tracker {
    /// `Tracker` constructor.
    ///
    /// # Errors
    ///
    /// Will return a `backends::error::Error` if the configured backend
    /// driver cannot be built.
    pub fn new(
        config: &Configuration,
        stats_event_sender: Option<Box<dyn statistics::EventSender>>,
        stats_repository: statistics::Repo,
    ) -> Result<Tracker, backends::error::Error> {
        let backend = Arc::new(backends::build(&config.driver)?);

        let mut seed: Vec<ClientId> = Vec::new();
        for raw in &config.core.client_whitelist {
            match ClientId::from_str(raw) {
                Ok(client_id) => seed.push(client_id),
                Err(_) => warn!("ignoring malformed client whitelist entry: {raw}"),
            }
        }

        Ok(Tracker {
            policy: config.core.announce_policy(),
            swarms: SwarmStore::new(config.core.torrent_map_shards),
            users: UserRegistry::new(),
            whitelist: ClientWhitelist::new(config.core.client_whitelist_enabled, seed),
            backend,
            stats_event_sender,
            stats_repository,
            config: config.core.clone(),
        })
    }

    /// Returns `true` if the tracker runs in private mode.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.config.private_enabled
    }

    #[must_use]
    pub fn get_announce_policy(&self) -> AnnouncePolicy {
        self.policy
    }

    #[must_use]
    pub fn backend(&self) -> Arc<Box<dyn Backend>> {
        self.backend.clone()
    }

    /// It handles an announce request.
    ///
    /// # Errors
    ///
    /// Will return a client-visible [`Error`] when authentication, the client
    /// gate or torrent resolution fails, or when the event is impossible in
    /// the peer's current state.
    pub async fn announce(&self, request: &Announce) -> Result<AnnounceData, Error> {
        let user = if self.is_private() {
            Some(self.authenticate(request.passkey.as_ref()).await?)
        } else {
            None
        };

        self.whitelist.approve(&request.peer_id).await?;

        let now = clock::now();
        let mut peer = Peer {
            peer_id: request.peer_id,
            endpoint: request.endpoint,
            user_id: user.as_ref().map_or(0, |u| u.id),
            torrent_id: 0,
            uploaded: request.uploaded,
            downloaded: request.downloaded,
            left: request.left,
            updated: now,
        };

        #[allow(clippy::cast_possible_truncation)]
        let numwant = request
            .numwant
            .map_or(self.config.default_num_want as usize, |n| n as usize)
            .min(TORRENT_PEERS_LIMIT);

        // Strict mode: a `stopped` from an unknown peer is an error rather
        // than a no-op.
        let strict = self.config.private_enabled;

        let touched = self
            .swarms
            .touch(&request.info_hash, self.config.create_on_announce, |swarm| {
                peer.torrent_id = swarm.id;
                let outcome = swarm.apply(peer, request.event, strict)?;

                let peers = if request.event == AnnounceEvent::Stopped {
                    vec![]
                } else {
                    swarm.select_peers(&peer.peer_id, numwant)
                };

                Ok::<_, Error>((outcome, swarm.metadata(), peers, swarm.up_multiplier, swarm.down_multiplier))
            });

        let Some((applied, swarm_created)) = touched else {
            return Err(Error::TorrentNotFound);
        };
        let (outcome, stats, peers, torrent_up_multiplier, torrent_down_multiplier) = applied?;

        debug!(
            "announce: infohash {} peer {} event {} created={} snatched={}",
            request.info_hash, request.peer_id, request.event, outcome.created, outcome.snatched
        );

        if swarm_created {
            self.send_stats_event(statistics::Event::NewTorrent).await;
        }
        self.send_stats_event(statistics::Event::Announce).await;
        if let Some(peer_event) = Self::peer_event_for(outcome.transition) {
            self.send_peer_stats_event(peer_event).await;
        }

        let delta = Self::build_delta(
            request,
            &peer,
            user,
            &outcome,
            (torrent_up_multiplier, torrent_down_multiplier),
            self.config.freeleech_enabled,
        );
        self.record_announce_delta(delta);

        Ok(AnnounceData {
            peers,
            stats,
            policy: self.policy,
            compact: request.compact,
        })
    }

    /// It handles a scrape request.
    ///
    /// # Errors
    ///
    /// Will return an [`Error`] only when private-mode authentication fails;
    /// unknown infohashes are silently omitted.
    pub async fn scrape(&self, request: &Scrape) -> Result<ScrapeData, Error> {
        if self.is_private() {
            self.authenticate(request.passkey.as_ref()).await?;
        }

        let mut scrape_data = ScrapeData::empty();

        for info_hash in &request.info_hashes {
            if let Some(entry) = self.swarms.find(info_hash) {
                if let Ok(swarm) = entry.lock() {
                    scrape_data.add_file(info_hash, swarm.metadata());
                }
            }
        }

        self.send_stats_event(statistics::Event::Scrape).await;

        Ok(scrape_data)
    }

    /// Remove stale peers, then (optionally) purge swarms that are empty and
    /// inactive.
    ///
    /// Reaping is best-effort: a swarm whose lock cannot be taken is logged
    /// and skipped, never aborting the pass.
    pub async fn reap(&self) {
        #[allow(clippy::cast_precision_loss)]
        let horizon = Duration::from_secs_f64(self.config.reap_interval as f64 * self.config.reap_ratio);
        let cutoff = clock::now_sub(&horizon);

        for (info_hash, peer_id) in self.swarms.iter_stale(cutoff) {
            let Some(entry) = self.swarms.find(&info_hash) else {
                continue;
            };

            let reaped = match entry.lock() {
                Ok(mut swarm) => {
                    // Re-check under the lock: the peer may have re-announced
                    // since the scan.
                    if let Some(peer) = swarm.seeders.get(&peer_id).copied() {
                        if peer.updated < cutoff {
                            swarm.seeders.remove(&peer_id);
                            Some(true)
                        } else {
                            None
                        }
                    } else if let Some(peer) = swarm.leechers.get(&peer_id).copied() {
                        if peer.updated < cutoff {
                            swarm.leechers.remove(&peer_id);
                            Some(false)
                        } else {
                            None
                        }
                    } else {
                        None
                    }
                }
                Err(err) => {
                    error!("reaper: skipping swarm {info_hash}: {err}");
                    None
                }
            };

            match reaped {
                Some(true) => self.send_peer_stats_event(statistics::PeerEvent::ReapedSeed).await,
                Some(false) => self.send_peer_stats_event(statistics::PeerEvent::ReapedLeech).await,
                None => None,
            };
        }

        if self.config.purge_inactive_torrents {
            #[allow(clippy::cast_precision_loss)]
            let idle = Duration::from_secs_f64(self.config.announce as f64 * self.config.reap_ratio);
            let idle_cutoff = clock::now_sub(&idle);

            for (info_hash, entry) in self.swarms.entries() {
                let purgeable = match entry.lock() {
                    Ok(swarm) => swarm.peer_count() == 0 && swarm.last_action < idle_cutoff,
                    Err(err) => {
                        error!("reaper: skipping swarm {info_hash}: {err}");
                        false
                    }
                };

                if purgeable && self.swarms.purge(&info_hash).is_some() {
                    debug!("reaper: purged inactive torrent {info_hash}");
                    self.send_stats_event(statistics::Event::ReapedTorrent).await;
                }
            }
        }
    }

    // Users

    /// It resolves a passkey to a user: memory first, then the backend,
    /// caching a backend hit.
    ///
    /// # Errors
    ///
    /// Will return [`Error::InvalidPasskey`] when no passkey was presented
    /// and [`Error::UserNotFound`] when it resolves nowhere.
    pub async fn find_user(&self, passkey: Option<&Passkey>) -> Result<User, Error> {
        let Some(passkey) = passkey else {
            return Err(Error::InvalidPasskey);
        };

        if let Ok(user) = self.users.find(passkey).await {
            return Ok(user);
        }

        match self.backend.find_user_by_passkey(passkey).await {
            Ok(user) => {
                self.users.insert(user.clone()).await;
                Ok(user)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn authenticate(&self, passkey: Option<&Passkey>) -> Result<User, Error> {
        self.find_user(passkey).await
    }

    /// It registers a user, generating its id and passkey, and mirrors the
    /// record to the backend.
    ///
    /// # Errors
    ///
    /// Will return an [`Error`] if no collision-free passkey could be
    /// generated.
    pub async fn register_user(&self, user: User) -> Result<User, Error> {
        let user = self.users.register(user).await?;

        if let Err(err) = self.backend.add_user(&user).await {
            error!("backend: failed to persist user {}: {err}", user.id);
        }

        Ok(user)
    }

    /// It deletes the user owning the passkey, in memory and in the backend.
    ///
    /// # Errors
    ///
    /// Will return [`Error::UserNotFound`] if no user owns the passkey.
    pub async fn delete_user(&self, passkey: &Passkey) -> Result<(), Error> {
        self.users.remove(passkey).await?;

        if let Err(err) = self.backend.delete_user(passkey).await {
            error!("backend: failed to delete user: {err}");
        }

        Ok(())
    }

    // Torrents

    /// It returns a serializable snapshot of one swarm.
    ///
    /// # Errors
    ///
    /// Will return [`Error::TorrentNotFound`] if the infohash resolves to no
    /// swarm.
    pub fn find_torrent(&self, info_hash: &InfoHash) -> Result<TorrentSnapshot, Error> {
        let entry = self.swarms.find(info_hash).ok_or(Error::TorrentNotFound)?;
        let swarm = entry.lock().map_err(|_| Error::Internal)?.clone();
        Ok(TorrentSnapshot {
            infohash: *info_hash,
            swarm,
        })
    }

    /// It creates or updates a swarm from admin-supplied data and mirrors the
    /// catalog entry to the backend.
    pub async fn put_torrent(&self, info_hash: &InfoHash, info: Option<TorrentInfo>) {
        let (_, created) = self
            .swarms
            .touch(info_hash, true, |swarm| {
                if info.is_some() {
                    swarm.info.clone_from(&info);
                }
            })
            .expect("touch with create always yields a swarm");

        if created {
            self.send_stats_event(statistics::Event::NewTorrent).await;
        }

        let torrent = BackendTorrent {
            id: 0,
            infohash: *info_hash,
            info,
        };
        if let Err(err) = self.backend.add_torrent(&torrent).await {
            error!("backend: failed to persist torrent {info_hash}: {err}");
        }
    }

    /// It deletes a swarm and all peers in it.
    ///
    /// # Errors
    ///
    /// Will return [`Error::TorrentNotFound`] if the infohash resolves to no
    /// swarm.
    pub async fn delete_torrent(&self, info_hash: &InfoHash) -> Result<(), Error> {
        if self.swarms.purge(info_hash).is_none() {
            return Err(Error::TorrentNotFound);
        }

        self.send_stats_event(statistics::Event::DeletedTorrent).await;

        if let Err(err) = self.backend.delete_torrent(info_hash).await {
            error!("backend: failed to delete torrent {info_hash}: {err}");
        }

        Ok(())
    }

    // Statistics

    /// It returns the tracker metrics.
    pub async fn get_stats(&self) -> tokio::sync::RwLockReadGuard<'_, statistics::Metrics> {
        self.stats_repository.get_stats().await
    }

    pub async fn send_stats_event(&self, event: statistics::Event) -> Option<Result<(), SendError<statistics::Event>>> {
        match &self.stats_event_sender {
            None => None,
            Some(sender) => sender.send_event(event).await,
        }
    }

    pub async fn send_peer_stats_event(
        &self,
        event: statistics::PeerEvent,
    ) -> Option<Result<(), SendError<statistics::PeerEvent>>> {
        match &self.stats_event_sender {
            None => None,
            Some(sender) => sender.send_peer_event(event).await,
        }
    }

    pub async fn send_stats_timing(&self, duration: Duration) -> Option<Result<(), SendError<Duration>>> {
        match &self.stats_event_sender {
            None => None,
            Some(sender) => sender.send_timing(duration).await,
        }
    }

    // Internals

    fn peer_event_for(transition: PeerTransition) -> Option<statistics::PeerEvent> {
        match transition {
            PeerTransition::None => None,
            PeerTransition::NewSeed => Some(statistics::PeerEvent::NewSeed),
            PeerTransition::NewLeech => Some(statistics::PeerEvent::NewLeech),
            PeerTransition::Completed => Some(statistics::PeerEvent::Completed),
            PeerTransition::DeletedSeed => Some(statistics::PeerEvent::DeletedSeed),
            PeerTransition::DeletedLeech => Some(statistics::PeerEvent::DeletedLeech),
        }
    }

    fn build_delta(
        request: &Announce,
        peer: &Peer,
        user: Option<User>,
        outcome: &swarm::AnnounceOutcome,
        torrent_multipliers: (f64, f64),
        freeleech: bool,
    ) -> AnnounceDelta {
        // Raw deltas are clamped at zero: cumulative counters reported by
        // clients may regress and are only advisory.
        let (raw_uploaded, raw_downloaded) = match &outcome.previous {
            Some(previous) => (
                request.uploaded.saturating_sub(previous.uploaded),
                request.downloaded.saturating_sub(previous.downloaded),
            ),
            None => (0, 0),
        };

        let (user_up, user_down) = user.as_ref().map_or((1.0, 1.0), |u| (u.up_multiplier, u.down_multiplier));
        let (torrent_up, torrent_down) = torrent_multipliers;

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let uploaded = (raw_uploaded as f64 * user_up * torrent_up) as u64;
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let downloaded = if freeleech {
            0
        } else {
            (raw_downloaded as f64 * user_down * torrent_down) as u64
        };

        AnnounceDelta {
            peer: *peer,
            info_hash: request.info_hash,
            user,
            created: outcome.created,
            snatched: outcome.snatched,
            uploaded,
            raw_uploaded,
            downloaded,
            raw_downloaded,
        }
    }

    fn record_announce_delta(&self, delta: AnnounceDelta) {
        let backend = self.backend.clone();
        tokio::spawn(async move {
            if let Err(err) = backend.record_announce(&delta).await {
                // A backend failure never fails the announce response.
                error!("backend: failed to record announce delta: {err}");
            }
        });
    }
}
