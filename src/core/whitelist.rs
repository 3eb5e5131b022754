//! The client whitelist: the set of peer-client prefixes a deployment
//! accepts.
//!
//! A client id is the 6-byte prefix of the peer id (skipping the leading `-`
//! of Azureus-style ids). When the whitelist is enabled every announce is
//! gated on it; writes come from the admin API and the configuration seed.
use std::collections::HashSet;
use std::str::FromStr;

use thiserror::Error;

use crate::core::error::Error;
use crate::core::peer;

/// The 6-byte client-software prefix of a peer id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub [u8; 6]);

impl From<&peer::Id> for ClientId {
    fn from(peer_id: &peer::Id) -> Self {
        Self(peer_id.client_id())
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Error returned when a string is not a 6-char client id.
#[derive(Debug, PartialEq, Eq, Error)]
#[error("client id must be exactly 6 characters")]
pub struct ParseClientIdError;

impl FromStr for ClientId {
    type Err = ParseClientIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 6 {
            return Err(ParseClientIdError);
        }
        let mut data = [0u8; 6];
        data.copy_from_slice(bytes);
        Ok(Self(data))
    }
}

/// The set of accepted client prefixes.
pub struct ClientWhitelist {
    enabled: bool,
    clients: tokio::sync::RwLock<HashSet<ClientId>>,
}

impl ClientWhitelist {
    #[must_use]
    pub fn new(enabled: bool, seed: impl IntoIterator<Item = ClientId>) -> Self {
        Self {
            enabled,
            clients: tokio::sync::RwLock::new(seed.into_iter().collect()),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// It checks an announce's peer id against the whitelist.
    ///
    /// # Errors
    ///
    /// Will return [`Error::ClientUnapproved`] if the whitelist is enabled and
    /// the client prefix is not in it.
    pub async fn approve(&self, peer_id: &peer::Id) -> Result<(), Error> {
        if !self.enabled {
            return Ok(());
        }

        if self.clients.read().await.contains(&ClientId::from(peer_id)) {
            Ok(())
        } else {
            Err(Error::ClientUnapproved)
        }
    }

    /// It checks whether a client id is present, regardless of the enabled
    /// flag. Used by the admin API.
    pub async fn contains(&self, client_id: &ClientId) -> bool {
        self.clients.read().await.contains(client_id)
    }

    pub async fn add(&self, client_id: ClientId) -> bool {
        self.clients.write().await.insert(client_id)
    }

    pub async fn remove(&self, client_id: &ClientId) -> bool {
        self.clients.write().await.remove(client_id)
    }
}

#[cfg(test)]
mod tests {

    mod the_client_whitelist {
        use std::str::FromStr;

        use crate::core::error::Error;
        use crate::core::peer;
        use crate::core::whitelist::{ClientId, ClientWhitelist};

        fn approved_client() -> ClientId {
            ClientId::from_str("qB4250").unwrap()
        }

        #[tokio::test]
        async fn it_should_approve_everything_when_disabled() {
            let whitelist = ClientWhitelist::new(false, []);

            let peer_id = peer::Id(*b"-XX0000-000000000000");

            assert!(whitelist.approve(&peer_id).await.is_ok());
        }

        #[tokio::test]
        async fn it_should_approve_a_whitelisted_client_prefix() {
            let whitelist = ClientWhitelist::new(true, [approved_client()]);

            let peer_id = peer::Id(*b"-qB4250-000000000000");

            assert!(whitelist.approve(&peer_id).await.is_ok());
        }

        #[tokio::test]
        async fn it_should_reject_a_client_prefix_that_is_not_whitelisted() {
            let whitelist = ClientWhitelist::new(true, [approved_client()]);

            let peer_id = peer::Id(*b"-YY0000-000000000000");

            assert_eq!(whitelist.approve(&peer_id).await.unwrap_err(), Error::ClientUnapproved);
        }

        #[tokio::test]
        async fn it_should_add_and_remove_clients_atomically() {
            let whitelist = ClientWhitelist::new(true, []);
            let client = approved_client();

            assert!(whitelist.add(client).await);
            assert!(whitelist.contains(&client).await);
            assert!(whitelist.remove(&client).await);
            assert!(!whitelist.contains(&client).await);
        }

        #[test]
        fn it_should_reject_client_id_strings_that_are_not_6_chars() {
            assert!(ClientId::from_str("short").is_err());
            assert!(ClientId::from_str("toolong").is_err());
        }
    }
}
