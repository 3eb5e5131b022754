//! The clearnet transport: plain TCP with identity lookups.
use async_trait::async_trait;
use tokio::net::TcpListener;

use super::{split_host_port, Error, Listener, Network};

#[derive(Default)]
pub struct Clearnet {}

#[async_trait]
impl Network for Clearnet {
    async fn setup(&self) -> Result<(), Error> {
        Ok(())
    }

    async fn listen(&self, addr: &str) -> Result<Listener, Error> {
        Ok(Listener::Tcp(TcpListener::bind(addr).await?))
    }

    async fn reverse_dns(&self, addr: &str) -> Result<Vec<String>, Error> {
        // No PTR dance on clearnet; peers are addressed by IP.
        let (host, _) = split_host_port(addr);
        Ok(vec![host])
    }

    async fn forward_dns(&self, name: &str) -> Result<Vec<String>, Error> {
        let addrs = tokio::net::lookup_host(format!("{name}:0"))
            .await
            .map_err(|err| Error::Lookup(err.to_string()))?;
        Ok(addrs.map(|addr| addr.ip().to_string()).collect())
    }

    fn split_public_private(&self, reverse: &str, raw: &str) -> (String, String) {
        (reverse.to_string(), raw.to_string())
    }

    async fn public_addr(&self, listener: &Listener) -> Result<String, Error> {
        Ok(listener.local_addr_string())
    }
}
