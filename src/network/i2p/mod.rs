//! The I2P transport, speaking to the router through a SAM bridge.
//!
//! `setup()` loads or creates the destination key file and opens the STREAM
//! session; listeners then accept tunnelled streams whose remote address is
//! the peer's full destination. Reverse resolution maps a destination to its
//! `<hash>.b32.i2p` name, which is the form surfaced to peers.
pub mod sam;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use base64::alphabet::Alphabet;
use base64::engine::general_purpose::GeneralPurposeConfig;
use base64::engine::{DecodePaddingMode, Engine, GeneralPurpose};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use self::sam::{DestKeys, Sam, Session};
use super::{Error, Listener, Network, RemoteAddr};
use crate::config::SamConfig;
use crate::core::peer::DestHash;

/// I2P's base64 flavour: the standard alphabet with `+/` replaced by `-~`.
static I2P_BASE64: LazyLock<GeneralPurpose> = LazyLock::new(|| {
    let alphabet = Alphabet::new("ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-~")
        .expect("the i2p alphabet is valid");
    GeneralPurpose::new(
        &alphabet,
        GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
    )
});

/// The `<base32 of sha256(destination)>.b32.i2p` name of a full destination.
///
/// # Errors
///
/// Will return an `Error` if the destination is not valid I2P base64.
pub fn destination_b32(destination: &str) -> Result<String, Error> {
    let raw = I2P_BASE64
        .decode(destination.trim_end_matches('='))
        .map_err(|err| Error::Lookup(format!("invalid destination: {err}")))?;

    let digest = Sha256::digest(&raw);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&digest);

    Ok(format!("{}.b32.i2p", DestHash(hash)))
}

pub struct I2p {
    config: SamConfig,
    session: RwLock<Option<Arc<Session>>>,
}

impl I2p {
    #[must_use]
    pub fn new(config: SamConfig) -> Self {
        Self {
            config,
            session: RwLock::new(None),
        }
    }

    async fn session(&self) -> Result<Arc<Session>, Error> {
        self.session.read().await.clone().ok_or(Error::NotReady)
    }

    /// It loads the destination keys from the key file, asking the bridge
    /// for a fresh pair on first start.
    async fn ensure_keys(&self, bridge: &Sam) -> Result<DestKeys, Error> {
        match tokio::fs::read_to_string(&self.config.keyfile).await {
            Ok(contents) => {
                let mut lines = contents.lines();
                match (lines.next(), lines.next()) {
                    (Some(public), Some(private)) => Ok(DestKeys {
                        public: public.trim().to_string(),
                        private: private.trim().to_string(),
                    }),
                    _ => Err(Error::Sam(format!("malformed keyfile: {}", self.config.keyfile))),
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let keys = bridge.generate_destination().await?;
                tokio::fs::write(&self.config.keyfile, format!("{}\n{}\n", keys.public, keys.private)).await?;
                Ok(keys)
            }
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl Network for I2p {
    async fn setup(&self) -> Result<(), Error> {
        let bridge = Sam::new(&self.config.addr);

        let keys = self.ensure_keys(&bridge).await?;

        let session = bridge
            .create_stream_session(&self.config.session, &keys, &self.config.opts)
            .await?;

        *self.session.write().await = Some(Arc::new(session));
        Ok(())
    }

    async fn listen(&self, _addr: &str) -> Result<Listener, Error> {
        // The session is the tunnel; bind addresses have no meaning here.
        Ok(Listener::Sam(SamListener {
            session: self.session().await?,
        }))
    }

    async fn reverse_dns(&self, addr: &str) -> Result<Vec<String>, Error> {
        Ok(vec![destination_b32(addr)?])
    }

    async fn forward_dns(&self, name: &str) -> Result<Vec<String>, Error> {
        let session = self.session().await?;
        Ok(vec![session.lookup(name).await?])
    }

    fn split_public_private(&self, reverse: &str, raw: &str) -> (String, String) {
        // Peers see the b32 name; the full destination stays internal.
        (reverse.to_string(), raw.to_string())
    }

    async fn public_addr(&self, _listener: &Listener) -> Result<String, Error> {
        let session = self.session().await?;
        destination_b32(session.destination())
    }
}

/// A listener over a STREAM session.
pub struct SamListener {
    session: Arc<Session>,
}

impl SamListener {
    /// It accepts the next tunnelled connection.
    ///
    /// # Errors
    ///
    /// Will return an `Error` if the bridge refuses the accept.
    pub async fn accept(&mut self) -> Result<(tokio::net::TcpStream, RemoteAddr), Error> {
        let (stream, destination) = self.session.accept().await?;
        Ok((stream, RemoteAddr(destination)))
    }

    #[must_use]
    pub fn local_addr_string(&self) -> String {
        self.session.destination().to_string()
    }
}
