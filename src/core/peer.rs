//! Peer types used by the core tracker.
//!
//! A peer is identified inside a swarm by its [`Id`]. Its transport address is
//! a [`PeerEndpoint`]: either an IP socket address (clearnet, Lokinet) or a
//! 32-byte overlay destination hash plus port (I2P). Byte counters are the
//! cumulative values reported by the client on its last announce; they are
//! advisory and only deltas derived from them are trusted downstream.
use std::net::IpAddr;
use std::panic::Location;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::shared::clock::DurationSinceUnixEpoch;

pub const PEER_ID_BYTES_LEN: usize = 20;

/// The number of bytes of an overlay destination hash.
pub const DEST_HASH_BYTES_LEN: usize = 32;

/// Peer struct used by the core tracker.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Peer {
    /// ID chosen by the downloader peer.
    pub peer_id: Id,
    /// The transport address this peer is reachable on.
    pub endpoint: PeerEndpoint,
    /// Id of the owning user. `0` for anonymous peers.
    #[serde(rename = "userId")]
    pub user_id: u64,
    /// Id of the swarm the peer belongs to.
    #[serde(rename = "torrentId")]
    pub torrent_id: u64,
    /// The total amount of bytes uploaded by this peer so far.
    pub uploaded: u64,
    /// The total amount of bytes downloaded by this peer so far.
    pub downloaded: u64,
    /// The number of bytes this peer still has to download.
    pub left: u64,
    /// The last time the tracker received an announce request from this peer.
    #[serde(rename = "lastAnnounce", serialize_with = "ser_unix_time_value")]
    pub updated: DurationSinceUnixEpoch,
}

/// Serializes a `DurationSinceUnixEpoch` as a Unix timestamp in seconds.
///
/// # Errors
///
/// Will return `serde::Serializer::Error` if unable to serialize the `unix_time_value`.
pub fn ser_unix_time_value<S: serde::Serializer>(unix_time_value: &DurationSinceUnixEpoch, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_u64(unix_time_value.as_secs())
}

impl Peer {
    /// A peer that has nothing left to download is a seeder.
    #[must_use]
    pub fn is_seeder(&self) -> bool {
        self.left == 0
    }
}

impl Ord for Peer {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.peer_id.cmp(&other.peer_id)
    }
}

impl PartialOrd for Peer {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// The event a peer reports in an announce request.
///
/// Any event string that is not `started`, `stopped` or `completed` (including
/// the empty string) counts as a plain periodic announce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AnnounceEvent {
    Started,
    Stopped,
    Completed,
    #[default]
    None,
}

impl AnnounceEvent {
    #[must_use]
    pub fn from_query_value(raw: &str) -> Self {
        match raw {
            "started" => Self::Started,
            "stopped" => Self::Stopped,
            "completed" => Self::Completed,
            _ => Self::None,
        }
    }
}

impl std::fmt::Display for AnnounceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Started => write!(f, "started"),
            Self::Stopped => write!(f, "stopped"),
            Self::Completed => write!(f, "completed"),
            Self::None => write!(f, ""),
        }
    }
}

/// Error returned when trying to convert an invalid peer id from another type.
///
/// Usually because the source format does not contain 20 bytes.
#[derive(Error, Debug)]
pub enum IdConversionError {
    #[error("not enough bytes for peer id: {message} {location}")]
    NotEnoughBytes {
        location: &'static Location<'static>,
        message: String,
    },
    #[error("too many bytes for peer id: {message} {location}")]
    TooManyBytes {
        location: &'static Location<'static>,
        message: String,
    },
}

/// ID chosen by the downloader peer: an opaque 20-byte value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Id(pub [u8; 20]);

impl Id {
    /// Converts to hex string.
    ///
    /// For the peer id `-qB00000000000000000` it returns
    /// `0x2d71423030303030303030303030303030303030`.
    ///
    /// Returns `None` if hexlifying fails, which cannot happen for a 20-byte
    /// input.
    #[must_use]
    pub fn to_hex_string(&self) -> Option<String> {
        let buff_size = self.0.len() * 2;
        let mut tmp: Vec<u8> = vec![0; buff_size];

        binascii::bin2hex(&self.0, &mut tmp).unwrap();

        match std::str::from_utf8(&tmp) {
            Ok(hex) => Some(format!("0x{hex}")),
            Err(_) => None,
        }
    }

    /// The client id: the prefix of the peer id that identifies the client
    /// software. It is the first 6 bytes, or bytes 1..7 when the peer id uses
    /// the Azureus `-XX1234-` convention.
    #[must_use]
    pub fn client_id(&self) -> [u8; 6] {
        let mut client_id = [0u8; 6];
        if self.0[0] == b'-' {
            client_id.copy_from_slice(&self.0[1..7]);
        } else {
            client_id.copy_from_slice(&self.0[..6]);
        }
        client_id
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_hex_string() {
            Some(hex) => write!(f, "{hex}"),
            None => write!(f, ""),
        }
    }
}

impl FromStr for Id {
    type Err = IdConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Id::try_from(s.as_bytes().to_vec())
    }
}

impl TryFrom<Vec<u8>> for Id {
    type Error = IdConversionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.len() < PEER_ID_BYTES_LEN {
            return Err(IdConversionError::NotEnoughBytes {
                location: Location::caller(),
                message: format! {"got {} bytes, expected {}", bytes.len(), PEER_ID_BYTES_LEN},
            });
        }
        if bytes.len() > PEER_ID_BYTES_LEN {
            return Err(IdConversionError::TooManyBytes {
                location: Location::caller(),
                message: format! {"got {} bytes, expected {}", bytes.len(), PEER_ID_BYTES_LEN},
            });
        }
        let mut data = [0u8; PEER_ID_BYTES_LEN];
        data.copy_from_slice(&bytes);
        Ok(Self(data))
    }
}

impl Serialize for Id {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex_string().unwrap_or_default())
    }
}

/// Error returned when a string is not a valid transport address.
#[derive(Error, Debug)]
pub enum AddrParseError {
    #[error("not an IP address nor an overlay destination hash: {raw}")]
    Unrecognized { raw: String },
}

/// A 32-byte overlay destination hash (I2P destination hash or Lokinet
/// address key), displayed as lowercase base32 without padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DestHash(pub [u8; 32]);

impl std::fmt::Display for DestHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buffer = [0u8; 64];
        let encoded = binascii::b32encode(&self.0, &mut buffer).expect("base32 output buffer is large enough");
        let b32 = std::str::from_utf8(encoded).unwrap().trim_end_matches('=').to_lowercase();
        write!(f, "{b32}")
    }
}

impl FromStr for DestHash {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept both bare base32 and the name forms used by the overlays.
        let name = s
            .trim_end_matches(".b32.i2p")
            .trim_end_matches(".loki")
            .to_uppercase();

        let mut padded = name.clone();
        while padded.len() % 8 != 0 {
            padded.push('=');
        }

        let mut buffer = [0u8; 40];
        let decoded = binascii::b32decode(padded.as_bytes(), &mut buffer).map_err(|_| AddrParseError::Unrecognized {
            raw: s.to_string(),
        })?;

        if decoded.len() != DEST_HASH_BYTES_LEN {
            return Err(AddrParseError::Unrecognized { raw: s.to_string() });
        }

        let mut data = [0u8; DEST_HASH_BYTES_LEN];
        data.copy_from_slice(decoded);
        Ok(Self(data))
    }
}

/// The address half of a peer endpoint: an IP address or an overlay
/// destination hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeerAddr {
    Ip(IpAddr),
    Overlay(DestHash),
}

impl std::fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ip(ip) => write!(f, "{ip}"),
            Self::Overlay(hash) => write!(f, "{hash}"),
        }
    }
}

impl FromStr for PeerAddr {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(ip) = s.parse::<IpAddr>() {
            return Ok(Self::Ip(ip));
        }
        Ok(Self::Overlay(s.parse::<DestHash>()?))
    }
}

impl Serialize for PeerAddr {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// The transport address a peer is reachable on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PeerEndpoint {
    pub addr: PeerAddr,
    pub port: u16,
}

impl std::fmt::Display for PeerEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

pub mod fixture {
    use std::net::{IpAddr, Ipv4Addr};

    use super::{Id, Peer, PeerAddr, PeerEndpoint};
    use crate::shared::clock::DurationSinceUnixEpoch;

    #[derive(Debug)]
    pub struct PeerBuilder {
        peer: Peer,
    }

    impl Default for PeerBuilder {
        fn default() -> Self {
            Self {
                peer: Peer {
                    peer_id: Id(*b"-qB00000000000000000"),
                    endpoint: PeerEndpoint {
                        addr: PeerAddr::Ip(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
                        port: 8080,
                    },
                    user_id: 0,
                    torrent_id: 0,
                    uploaded: 0,
                    downloaded: 0,
                    left: 0,
                    updated: DurationSinceUnixEpoch::new(1_669_397_478, 0),
                },
            }
        }
    }

    impl PeerBuilder {
        #[must_use]
        pub fn seeder() -> Self {
            Self::default().with_peer_id(&Id(*b"-qB00000000000000001")).with_left(0)
        }

        #[must_use]
        pub fn leecher() -> Self {
            Self::default().with_peer_id(&Id(*b"-qB00000000000000002")).with_left(1000)
        }

        #[must_use]
        pub fn with_peer_id(mut self, peer_id: &Id) -> Self {
            self.peer.peer_id = *peer_id;
            self
        }

        #[must_use]
        pub fn with_endpoint(mut self, endpoint: &PeerEndpoint) -> Self {
            self.peer.endpoint = *endpoint;
            self
        }

        #[must_use]
        pub fn with_bytes(mut self, uploaded: u64, downloaded: u64) -> Self {
            self.peer.uploaded = uploaded;
            self.peer.downloaded = downloaded;
            self
        }

        #[must_use]
        pub fn with_left(mut self, left: u64) -> Self {
            self.peer.left = left;
            self
        }

        #[must_use]
        pub fn last_updated_on(mut self, updated: DurationSinceUnixEpoch) -> Self {
            self.peer.updated = updated;
            self
        }

        #[must_use]
        pub fn build(self) -> Peer {
            self.peer
        }
    }
}

#[cfg(test)]
mod tests {

    mod torrent_peer_id {
        use crate::core::peer;

        #[test]
        fn should_be_converted_to_hex_string() {
            let id = peer::Id(*b"-qB00000000000000000");
            assert_eq!(id.to_hex_string().unwrap(), "0x2d71423030303030303030303030303030303030");
        }

        #[test]
        fn should_fail_trying_to_convert_from_a_byte_vector_with_less_than_20_bytes() {
            assert!(peer::Id::try_from([0; 19].to_vec()).is_err());
        }

        #[test]
        fn should_fail_trying_to_convert_from_a_byte_vector_with_more_than_20_bytes() {
            assert!(peer::Id::try_from([0; 21].to_vec()).is_err());
        }

        #[test]
        fn should_derive_the_client_id_from_the_first_six_bytes() {
            let id = peer::Id(*b"M7-9-9--000000000000");
            assert_eq!(&id.client_id(), b"M7-9-9");
        }

        #[test]
        fn should_derive_the_client_id_skipping_the_leading_dash() {
            let id = peer::Id(*b"-qB4250-000000000000");
            assert_eq!(&id.client_id(), b"qB4250");
        }
    }

    mod dest_hash {
        use std::str::FromStr;

        use crate::core::peer::DestHash;

        #[test]
        fn should_round_trip_through_base32() {
            let hash = DestHash([0xAB; 32]);
            let encoded = hash.to_string();

            assert_eq!(encoded.len(), 52);
            assert_eq!(DestHash::from_str(&encoded).unwrap(), hash);
        }

        #[test]
        fn should_accept_overlay_name_suffixes() {
            let hash = DestHash([0x11; 32]);

            let b32_i2p = format!("{hash}.b32.i2p");
            let loki = format!("{hash}.loki");

            assert_eq!(DestHash::from_str(&b32_i2p).unwrap(), hash);
            assert_eq!(DestHash::from_str(&loki).unwrap(), hash);
        }

        #[test]
        fn should_reject_garbage() {
            assert!(DestHash::from_str("not-a-destination").is_err());
        }
    }

    mod peer_addr {
        use std::net::{IpAddr, Ipv4Addr};
        use std::str::FromStr;

        use crate::core::peer::{DestHash, PeerAddr};

        #[test]
        fn should_parse_an_ip_address() {
            assert_eq!(
                PeerAddr::from_str("126.0.0.1").unwrap(),
                PeerAddr::Ip(IpAddr::V4(Ipv4Addr::new(126, 0, 0, 1)))
            );
        }

        #[test]
        fn should_parse_an_overlay_destination() {
            let hash = DestHash([0x42; 32]);
            assert_eq!(PeerAddr::from_str(&hash.to_string()).unwrap(), PeerAddr::Overlay(hash));
        }
    }

    mod announce_event {
        use crate::core::peer::AnnounceEvent;

        #[test]
        fn should_treat_unknown_event_strings_as_a_plain_announce() {
            assert_eq!(AnnounceEvent::from_query_value("paused"), AnnounceEvent::None);
            assert_eq!(AnnounceEvent::from_query_value(""), AnnounceEvent::None);
        }

        #[test]
        fn should_recognize_the_three_standard_events() {
            assert_eq!(AnnounceEvent::from_query_value("started"), AnnounceEvent::Started);
            assert_eq!(AnnounceEvent::from_query_value("stopped"), AnnounceEvent::Stopped);
            assert_eq!(AnnounceEvent::from_query_value("completed"), AnnounceEvent::Completed);
        }
    }
}
