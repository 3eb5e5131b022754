//! The backend driver: optional persistence behind the tracker.
//!
//! A backend keeps the user registry and torrent catalog of an index site and
//! records per-announce deltas for ratio accounting. The tracker core never
//! blocks a response on it: announce deltas are handed off asynchronously and
//! a backend failure is logged, not surfaced.
//!
//! Drivers are selected by name at startup. The [`noop`] driver is the
//! default so that public trackers need no persistence at all.
pub mod error;
pub mod noop;

use async_trait::async_trait;

use self::error::Error;
use crate::config::DriverConfig;
use crate::core::auth::{Passkey, User};
use crate::core::peer::Peer;
use crate::core::swarm::{TorrentCategory, TorrentInfo};
use crate::shared::bit_torrent::info_hash::InfoHash;

/// The changes to a peer's state produced by one announce, as recorded by the
/// backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnounceDelta {
    pub peer: Peer,
    pub info_hash: InfoHash,
    /// The announcing user, when the deployment is private.
    pub user: Option<User>,

    /// True if this announce created a new peer or changed an existing
    /// peer's address.
    pub created: bool,
    /// True if this announce completed the download.
    pub snatched: bool,

    /// Upload delta scaled by the user and torrent multipliers, in bytes.
    pub uploaded: u64,
    pub raw_uploaded: u64,

    /// Download delta scaled by the user and torrent multipliers, in bytes.
    /// Zero when freeleech is enabled.
    pub downloaded: u64,
    pub raw_downloaded: u64,
}

/// A torrent as the backend stores it: catalog data without the swarm.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BackendTorrent {
    #[serde(default)]
    pub id: u64,
    pub infohash: InfoHash,
    #[serde(default)]
    pub info: Option<TorrentInfo>,
}

/// The persistence trait. Implementations must be safe for concurrent use.
#[async_trait]
pub trait Backend: Sync + Send {
    /// Liveness probe.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the storage behind the driver is unreachable.
    async fn ping(&self) -> Result<(), Error>;

    /// It persists the delta produced by one announce. May complete the write
    /// asynchronously; the caller already runs outside the swarm lock.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the delta could not be recorded.
    async fn record_announce(&self, delta: &AnnounceDelta) -> Result<(), Error>;

    /// It adds a torrent to the catalog.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the torrent could not be stored.
    async fn add_torrent(&self, torrent: &BackendTorrent) -> Result<(), Error>;

    /// It removes a torrent from the catalog.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the torrent could not be removed.
    async fn delete_torrent(&self, info_hash: &InfoHash) -> Result<(), Error>;

    /// It looks a torrent up by infohash.
    ///
    /// # Errors
    ///
    /// Will return [`Error::TorrentNotFound`] if the catalog has no such
    /// torrent.
    async fn get_torrent_by_infohash(&self, info_hash: &InfoHash) -> Result<BackendTorrent, Error>;

    /// It loads torrents in bulk by id.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the catalog could not be read.
    async fn load_torrents(&self, ids: &[u64]) -> Result<Vec<BackendTorrent>, Error>;

    /// It stores a user, returning the stored record including its passkey.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the user could not be stored.
    async fn add_user(&self, user: &User) -> Result<User, Error>;

    /// It removes the user owning the passkey.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the user could not be removed.
    async fn delete_user(&self, passkey: &Passkey) -> Result<(), Error>;

    /// It finds the user owning the passkey.
    ///
    /// # Errors
    ///
    /// Will return [`Error::UserNotFound`] if no user owns the passkey.
    async fn find_user_by_passkey(&self, passkey: &Passkey) -> Result<User, Error>;

    /// It loads users in bulk by id.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the registry could not be read.
    async fn load_users(&self, ids: &[u64]) -> Result<Vec<User>, Error>;

    /// The torrent categories known to the index.
    ///
    /// # Errors
    ///
    /// Will return `Err` if the catalog could not be read.
    async fn categories(&self) -> Result<Vec<TorrentCategory>, Error>;
}

/// It builds the backend driver named by the configuration.
///
/// # Errors
///
/// Will return [`Error::UnknownDriver`] for a driver name this build does not
/// provide.
pub fn build(config: &DriverConfig) -> Result<Box<dyn Backend>, Error> {
    match config.name.as_str() {
        "noop" | "" => Ok(Box::new(noop::NoOp {})),
        name => Err(Error::UnknownDriver { name: name.to_string() }),
    }
}
