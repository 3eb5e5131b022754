//! The pluggable network transport.
//!
//! A [`Network`] supplies everything the delivery layer needs to run on a
//! concrete transport: listeners, forward and reverse name lookup, the
//! public/private classification of client addresses, and the address to
//! advertise in tracker responses and index pages.
//!
//! Three variants satisfy the same contract with identical announce/scrape
//! semantics on top:
//!
//! - [`clearnet`]: plain TCP and identity lookups.
//! - [`lokinet`]: plain TCP plus a Lokinet-aware DNS resolver for `.loki`
//!   names.
//! - [`i2p`]: streams through a SAM bridge; addresses are destination
//!   hashes.
//!
//! One instance is selected at process startup and shared by all servers.
pub mod clearnet;
pub mod i2p;
pub mod lokinet;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

use crate::config::NetworkConfig;

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sam bridge error: {0}")]
    Sam(String),

    #[error("name lookup failed: {0}")]
    Lookup(String),

    #[error("unknown network transport: {0}")]
    UnknownTransport(String),

    #[error("transport has not been set up")]
    NotReady,
}

/// The transport-native address of an accepted connection, as an opaque
/// string: `ip:port` on clearnet and Lokinet, a full destination on I2P.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAddr(pub String);

impl std::fmt::Display for RemoteAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A listener produced by a transport. Accepted connections are TCP streams
/// either way: directly on clearnet/Lokinet, or to the SAM bridge on I2P.
pub enum Listener {
    Tcp(TcpListener),
    Sam(i2p::SamListener),
}

impl Listener {
    /// It waits for the next inbound connection.
    ///
    /// # Errors
    ///
    /// Will return an `Error` if accepting fails; the caller decides whether
    /// to retry.
    pub async fn accept(&mut self) -> Result<(TcpStream, RemoteAddr), Error> {
        match self {
            Listener::Tcp(listener) => {
                let (stream, addr) = listener.accept().await?;
                Ok((stream, RemoteAddr(addr.to_string())))
            }
            Listener::Sam(listener) => listener.accept().await,
        }
    }

    /// The transport-native local address, for logging and public-address
    /// derivation.
    #[must_use]
    pub fn local_addr_string(&self) -> String {
        match self {
            Listener::Tcp(listener) => listener
                .local_addr()
                .map_or_else(|_| String::new(), |addr| addr.to_string()),
            Listener::Sam(listener) => listener.local_addr_string(),
        }
    }
}

/// The capability set a transport provides.
#[async_trait]
pub trait Network: Send + Sync {
    /// One-time initialization: key material, tunnel creation.
    ///
    /// # Errors
    ///
    /// Will return an `Error` if the transport backend is unreachable.
    async fn setup(&self) -> Result<(), Error>;

    /// It produces a listener bound to `addr` (transport-dependent; ignored
    /// by transports that listen on a tunnel).
    ///
    /// # Errors
    ///
    /// Will return an `Error` if binding fails.
    async fn listen(&self, addr: &str) -> Result<Listener, Error>;

    /// It maps a bind or remote address to its human-facing names, e.g. the
    /// base32 overlay name.
    ///
    /// # Errors
    ///
    /// Will return an `Error` if resolution fails or yields nothing.
    async fn reverse_dns(&self, addr: &str) -> Result<Vec<String>, Error>;

    /// The opposite direction; used when requests contain symbolic
    /// destinations.
    ///
    /// # Errors
    ///
    /// Will return an `Error` if resolution fails.
    async fn forward_dns(&self, name: &str) -> Result<Vec<String>, Error>;

    /// It classifies which of the two inputs to surface to peers (public)
    /// and which to keep internal (private).
    fn split_public_private(&self, reverse: &str, raw: &str) -> (String, String);

    /// The address to advertise in tracker responses and index pages.
    ///
    /// # Errors
    ///
    /// Will return an `Error` if the listener address cannot be resolved.
    async fn public_addr(&self, listener: &Listener) -> Result<String, Error>;
}

/// It builds the transport named by the configuration.
///
/// # Errors
///
/// Will return [`Error::UnknownTransport`] for a name this build does not
/// provide.
pub fn build(config: &NetworkConfig) -> Result<Arc<dyn Network>, Error> {
    match config.name.as_str() {
        "clearnet" | "" => Ok(Arc::new(clearnet::Clearnet::default())),
        "lokinet" => Ok(Arc::new(lokinet::Lokinet::new(&config.lokinet.resolver_addr)?)),
        "i2p" => Ok(Arc::new(i2p::I2p::new(config.i2p.clone()))),
        name => Err(Error::UnknownTransport(name.to_string())),
    }
}

/// It splits `host:port`, tolerating bracketed IPv6 and portless input.
#[must_use]
pub fn split_host_port(addr: &str) -> (String, Option<u16>) {
    if let Ok(socket_addr) = addr.parse::<std::net::SocketAddr>() {
        return (socket_addr.ip().to_string(), Some(socket_addr.port()));
    }
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => match port.parse::<u16>() {
            Ok(port) => (host.to_string(), Some(port)),
            Err(_) => (addr.to_string(), None),
        },
        _ => (addr.to_string(), None),
    }
}

#[cfg(test)]
mod tests {
    use crate::config::NetworkConfig;
    use crate::network::{build, split_host_port};

    #[test]
    fn it_should_build_the_clearnet_transport_by_default() {
        assert!(build(&NetworkConfig::default()).is_ok());
    }

    #[test]
    fn it_should_fail_for_an_unknown_transport_name() {
        let config = NetworkConfig {
            name: "carrier-pigeon".to_string(),
            ..Default::default()
        };

        assert!(build(&config).is_err());
    }

    #[test]
    fn it_should_split_ipv4_host_and_port() {
        assert_eq!(split_host_port("1.2.3.4:6881"), ("1.2.3.4".to_string(), Some(6881)));
    }

    #[test]
    fn it_should_split_bracketed_ipv6_host_and_port() {
        assert_eq!(split_host_port("[::1]:6881"), ("::1".to_string(), Some(6881)));
    }

    #[test]
    fn it_should_pass_through_portless_input() {
        assert_eq!(split_host_port("tracker.loki"), ("tracker.loki".to_string(), None));
        assert_eq!(split_host_port("::1"), ("::1".to_string(), None));
    }
}
