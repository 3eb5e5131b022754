//! The Lokinet transport: plain TCP listeners, with name lookups routed
//! through a Lokinet-aware DNS resolver.
//!
//! Lokinet exposes `.loki` names through a local DNS server (by default on
//! `127.0.0.1:1153`); reverse lookups turn a tunnel IP back into the
//! caller's `.loki` name, which is what gets surfaced to other peers.
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use hickory_resolver::config::{NameServerConfig, Protocol, ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use tokio::net::TcpListener;

use super::{split_host_port, Error, Listener, Network};

pub struct Lokinet {
    resolver: TokioAsyncResolver,
}

impl Lokinet {
    /// It builds the transport with a resolver pointed at `resolver_addr`.
    ///
    /// # Errors
    ///
    /// Will return an `Error` if the resolver address cannot be parsed.
    pub fn new(resolver_addr: &str) -> Result<Self, Error> {
        let socket_addr: SocketAddr = resolver_addr
            .parse()
            .map_err(|_| Error::Lookup(format!("invalid resolver address: {resolver_addr}")))?;

        let mut config = ResolverConfig::new();
        config.add_name_server(NameServerConfig::new(socket_addr, Protocol::Udp));

        Ok(Self {
            resolver: TokioAsyncResolver::tokio(config, ResolverOpts::default()),
        })
    }
}

#[async_trait]
impl Network for Lokinet {
    async fn setup(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn listen(&self, addr: &str) -> Result<Listener, Error> {
        Ok(Listener::Tcp(TcpListener::bind(addr).await?))
    }

    async fn reverse_dns(&self, addr: &str) -> Result<Vec<String>, Error> {
        let (host, _) = split_host_port(addr);
        let ip: IpAddr = host
            .parse()
            .map_err(|_| Error::Lookup(format!("not an ip address: {host}")))?;

        let names = self
            .resolver
            .reverse_lookup(ip)
            .await
            .map_err(|err| Error::Lookup(err.to_string()))?;

        Ok(names
            .iter()
            .map(|name| name.to_string().trim_end_matches('.').to_string())
            .collect())
    }

    async fn forward_dns(&self, name: &str) -> Result<Vec<String>, Error> {
        let ips = self
            .resolver
            .lookup_ip(name)
            .await
            .map_err(|err| Error::Lookup(err.to_string()))?;

        Ok(ips.iter().map(|ip| ip.to_string()).collect())
    }

    fn split_public_private(&self, reverse: &str, raw: &str) -> (String, String) {
        // The `.loki` name is what other peers can dial; the tunnel IP stays
        // internal.
        let (host, _) = split_host_port(raw);
        (reverse.to_string(), host)
    }

    async fn public_addr(&self, listener: &Listener) -> Result<String, Error> {
        let local = listener.local_addr_string();
        let (_, port) = split_host_port(&local);

        let names = self.reverse_dns(&local).await?;
        let name = names.first().ok_or_else(|| Error::Lookup("no reverse dns".to_string()))?;

        match port {
            Some(port) => Ok(format!("{name}:{port}")),
            None => Ok(name.clone()),
        }
    }
}
