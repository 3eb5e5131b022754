//! The no-op backend: the default driver for public deployments.
//!
//! It satisfies the [`Backend`](crate::core::backends::Backend) contract by
//! returning empty results and never failing, except where not-found
//! semantics are part of the contract.
use async_trait::async_trait;

use super::error::Error;
use super::{AnnounceDelta, Backend, BackendTorrent};
use crate::core::auth::{Passkey, User};
use crate::core::swarm::TorrentCategory;
use crate::shared::bit_torrent::info_hash::InfoHash;

pub struct NoOp {}

#[async_trait]
impl Backend for NoOp {
    async fn ping(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn record_announce(&self, _delta: &AnnounceDelta) -> Result<(), Error> {
        Ok(())
    }

    async fn add_torrent(&self, _torrent: &BackendTorrent) -> Result<(), Error> {
        Ok(())
    }

    async fn delete_torrent(&self, _info_hash: &InfoHash) -> Result<(), Error> {
        Ok(())
    }

    async fn get_torrent_by_infohash(&self, _info_hash: &InfoHash) -> Result<BackendTorrent, Error> {
        Err(Error::TorrentNotFound)
    }

    async fn load_torrents(&self, _ids: &[u64]) -> Result<Vec<BackendTorrent>, Error> {
        Ok(vec![])
    }

    async fn add_user(&self, user: &User) -> Result<User, Error> {
        Ok(user.clone())
    }

    async fn delete_user(&self, _passkey: &Passkey) -> Result<(), Error> {
        Ok(())
    }

    async fn find_user_by_passkey(&self, _passkey: &Passkey) -> Result<User, Error> {
        Err(Error::UserNotFound)
    }

    async fn load_users(&self, _ids: &[u64]) -> Result<Vec<User>, Error> {
        Ok(vec![])
    }

    async fn categories(&self) -> Result<Vec<TorrentCategory>, Error> {
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use crate::core::auth;
    use crate::core::backends::noop::NoOp;
    use crate::core::backends::Backend;
    use crate::shared::bit_torrent::info_hash::InfoHash;

    #[tokio::test]
    async fn it_should_always_be_alive() {
        assert!(NoOp {}.ping().await.is_ok());
    }

    #[tokio::test]
    async fn it_should_return_not_found_for_any_user_lookup() {
        let passkey = auth::generate();

        assert!(NoOp {}.find_user_by_passkey(&passkey).await.is_err());
    }

    #[tokio::test]
    async fn it_should_return_not_found_for_any_torrent_lookup() {
        assert!(NoOp {}.get_torrent_by_infohash(&InfoHash([0u8; 20])).await.is_err());
    }

    #[tokio::test]
    async fn it_should_return_empty_bulk_results() {
        assert!(NoOp {}.load_users(&[1, 2]).await.unwrap().is_empty());
        assert!(NoOp {}.load_torrents(&[1, 2]).await.unwrap().is_empty());
        assert!(NoOp {}.categories().await.unwrap().is_empty());
    }
}
