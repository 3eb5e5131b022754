//! `Announce` response for the HTTP tracker.
//!
//! Both representations are bencoded dictionaries:
//!
//! - [`NonCompact`]: peers as a list of dictionaries with `ip`, `peer id`
//!   and `port`.
//! - [`Compact`]: peers as packed byte strings. IPv4 peers pack as 4 address
//!   bytes plus a big-endian port; IPv6 peers go into `peers6` as 16 plus 2
//!   bytes; overlay peers pack their 32-byte destination hash plus the port
//!   into `peers`.
//!
//! Peer ids and destination hashes are raw bytes, so the bodies are written
//! out by hand instead of through a string-typed serializer.
use std::io::Write;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::config::AnnouncePolicy;
use crate::core::peer::{Peer, PeerAddr};
use crate::core::swarm::SwarmMetadata;
use crate::core::AnnounceData;

/// Normal (non compact) `announce` response.
#[derive(Debug, PartialEq)]
pub struct NonCompact {
    pub policy: AnnouncePolicy,
    pub stats: SwarmMetadata,
    pub peers: Vec<Peer>,
}

impl NonCompact {
    /// Returns the bencoded body of the non-compact response.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut bytes: Vec<u8> = Vec::new();

        // Dictionary keys are written in sorted order, as bencode requires.
        write!(
            bytes,
            "d7:compacti0e8:completei{}e10:incompletei{}e8:intervali{}e12:min intervali{}e5:peersl",
            self.stats.complete, self.stats.incomplete, self.policy.interval, self.policy.interval_min
        )
        .unwrap();

        for peer in &self.peers {
            let address = peer.endpoint.addr.to_string();
            write!(bytes, "d2:ip{}:{address}7:peer id20:", address.len()).unwrap();
            bytes.extend_from_slice(&peer.peer_id.0);
            write!(bytes, "4:porti{}ee", peer.endpoint.port).unwrap();
        }

        write!(bytes, "ee").unwrap();
        bytes
    }
}

impl IntoResponse for NonCompact {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

impl From<AnnounceData> for NonCompact {
    fn from(data: AnnounceData) -> Self {
        Self {
            policy: data.policy,
            stats: data.stats,
            peers: data.peers,
        }
    }
}

/// Compact `announce` response.
///
/// _"To reduce the size of tracker responses and to reduce memory and
/// computational requirements in trackers, trackers may return peers as a
/// packed string rather than as a bencoded list."_
#[derive(Debug, PartialEq)]
pub struct Compact {
    pub policy: AnnouncePolicy,
    pub stats: SwarmMetadata,
    pub peers: Vec<Peer>,
}

impl Compact {
    /// Returns the bencoded body of the compact response.
    #[must_use]
    pub fn body(&self) -> Vec<u8> {
        let mut peers: Vec<u8> = Vec::new();
        let mut peers6: Vec<u8> = Vec::new();

        for peer in &self.peers {
            match peer.endpoint.addr {
                PeerAddr::Ip(std::net::IpAddr::V4(ip)) => {
                    peers.extend_from_slice(&ip.octets());
                    peers.extend_from_slice(&peer.endpoint.port.to_be_bytes());
                }
                PeerAddr::Ip(std::net::IpAddr::V6(ip)) => {
                    peers6.extend_from_slice(&ip.octets());
                    peers6.extend_from_slice(&peer.endpoint.port.to_be_bytes());
                }
                PeerAddr::Overlay(hash) => {
                    peers.extend_from_slice(&hash.0);
                    peers.extend_from_slice(&peer.endpoint.port.to_be_bytes());
                }
            }
        }

        let mut bytes: Vec<u8> = Vec::new();
        write!(
            bytes,
            "d7:compacti1e8:completei{}e10:incompletei{}e8:intervali{}e12:min intervali{}e5:peers{}:",
            self.stats.complete,
            self.stats.incomplete,
            self.policy.interval,
            self.policy.interval_min,
            peers.len()
        )
        .unwrap();
        bytes.extend_from_slice(&peers);
        write!(bytes, "6:peers6{}:", peers6.len()).unwrap();
        bytes.extend_from_slice(&peers6);
        write!(bytes, "e").unwrap();
        bytes
    }
}

impl IntoResponse for Compact {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.body()).into_response()
    }
}

impl From<AnnounceData> for Compact {
    fn from(data: AnnounceData) -> Self {
        Self {
            policy: data.policy,
            stats: data.stats,
            peers: data.peers,
        }
    }
}

/// It builds the response the announce data asks for: compact or not.
#[must_use]
pub fn build_response(data: AnnounceData) -> Response {
    if data.compact {
        Compact::from(data).into_response()
    } else {
        NonCompact::from(data).into_response()
    }
}
