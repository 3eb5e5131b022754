//! It resolves the announcing client's transport address through the
//! network abstraction.
//!
//! The raw connection address (or the configured real-IP header value) goes
//! through a reverse lookup, the transport classifies the public half, and
//! the result parses into a [`PeerAddr`]. Lookups carry a short timeout: a
//! resolver that hangs must not stall the announce path.
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::core::peer::PeerAddr;
use crate::network::{self, Network};

/// Default budget for one reverse lookup.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum PeerAddrResolutionError {
    #[error("reverse lookup timed out for {raw_addr}")]
    Timeout { raw_addr: String },

    #[error("no reverse dns for {raw_addr}")]
    NoReverse { raw_addr: String },

    #[error("reverse lookup failed: {source}")]
    Lookup {
        #[from]
        source: network::Error,
    },

    #[error("cannot parse peer address {public}")]
    Unparseable { public: String },
}

/// It derives the address to store for the announcing peer.
///
/// # Errors
///
/// Will return a `PeerAddrResolutionError` if the lookup times out, fails or
/// yields nothing parseable.
pub async fn invoke(network: &Arc<dyn Network>, raw_addr: &str) -> Result<PeerAddr, PeerAddrResolutionError> {
    let names = tokio::time::timeout(LOOKUP_TIMEOUT, network.reverse_dns(raw_addr))
        .await
        .map_err(|_| PeerAddrResolutionError::Timeout {
            raw_addr: raw_addr.to_string(),
        })??;

    let reverse = names.first().ok_or_else(|| PeerAddrResolutionError::NoReverse {
        raw_addr: raw_addr.to_string(),
    })?;

    let (public, _private) = network.split_public_private(reverse, raw_addr);

    public
        .parse::<PeerAddr>()
        .map_err(|_| PeerAddrResolutionError::Unparseable { public })
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use crate::core::peer::PeerAddr;
    use crate::network::clearnet::Clearnet;
    use crate::network::Network;
    use crate::servers::http::v1::services::peer_addr_resolver::invoke;

    #[tokio::test]
    async fn it_should_resolve_a_clearnet_socket_address_to_its_ip() {
        let network: Arc<dyn Network> = Arc::new(Clearnet::default());

        let peer_addr = invoke(&network, "126.0.0.1:6881").await.unwrap();

        assert_eq!(peer_addr, PeerAddr::Ip(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1))));
    }

    #[tokio::test]
    async fn it_should_fail_for_an_address_that_parses_nowhere() {
        let network: Arc<dyn Network> = Arc::new(Clearnet::default());

        assert!(invoke(&network, "garbage value").await.is_err());
    }
}
