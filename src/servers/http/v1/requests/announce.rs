//! `Announce` request for the HTTP tracker.
//!
//! Data structures and logic for parsing the `announce` request out of the
//! URL query component.
use std::panic::Location;
use std::str::FromStr;

use thiserror::Error;

use crate::core::peer::{self, AnnounceEvent, IdConversionError};
use crate::servers::http::percent_encoding::{percent_decode_info_hash, percent_decode_peer_id};
use crate::servers::http::v1::query::{ParseQueryError, Query};
use crate::shared::bit_torrent::info_hash::{ConversionError, InfoHash};

// Query param names
const INFO_HASH: &str = "info_hash";
const PEER_ID: &str = "peer_id";
const PORT: &str = "port";
const DOWNLOADED: &str = "downloaded";
const UPLOADED: &str = "uploaded";
const LEFT: &str = "left";
const EVENT: &str = "event";
const COMPACT: &str = "compact";
const NUMWANT: &str = "numwant";

/// The parsed `announce` request, before address resolution and
/// authentication attach the transport- and user-level context.
///
/// `info_hash`, `peer_id` and `port` are mandatory; byte counters default to
/// zero when absent (a `stopped` announce routinely omits them).
#[derive(Debug, PartialEq)]
pub struct Announce {
    pub info_hash: InfoHash,
    pub peer_id: peer::Id,
    pub port: u16,
    pub uploaded: u64,
    pub downloaded: u64,
    pub left: u64,
    pub event: AnnounceEvent,
    pub numwant: Option<u32>,
    pub compact: bool,
}

/// Errors that can occur when parsing the `Announce` request.
#[derive(Error, Debug)]
pub enum ParseAnnounceQueryError {
    #[error("missing query params for announce request in {location}")]
    MissingParams { location: &'static Location<'static> },
    #[error("missing param {param_name} in {location}")]
    MissingParam {
        location: &'static Location<'static>,
        param_name: String,
    },
    #[error("invalid param value {param_value} for {param_name} in {location}")]
    InvalidParam {
        param_name: String,
        param_value: String,
        location: &'static Location<'static>,
    },
    #[error("invalid param value {param_value} for {param_name}: {source}")]
    InvalidInfoHashParam {
        param_name: String,
        param_value: String,
        source: ConversionError,
    },
    #[error("invalid param value {param_value} for {param_name}: {source}")]
    InvalidPeerIdParam {
        param_name: String,
        param_value: String,
        source: IdConversionError,
    },
}

impl TryFrom<Query> for Announce {
    type Error = ParseAnnounceQueryError;

    fn try_from(query: Query) -> Result<Self, Self::Error> {
        Ok(Self {
            info_hash: extract_info_hash(&query)?,
            peer_id: extract_peer_id(&query)?,
            port: extract_port(&query)?,
            uploaded: extract_number_of_bytes(&query, UPLOADED)?,
            downloaded: extract_number_of_bytes(&query, DOWNLOADED)?,
            left: extract_number_of_bytes(&query, LEFT)?,
            event: extract_event(&query),
            numwant: extract_numwant(&query),
            compact: extract_compact(&query)?,
        })
    }
}

// Mandatory params

fn extract_info_hash(query: &Query) -> Result<InfoHash, ParseAnnounceQueryError> {
    match query.get_param(INFO_HASH) {
        Some(raw_param) => {
            percent_decode_info_hash(&raw_param).map_err(|err| ParseAnnounceQueryError::InvalidInfoHashParam {
                param_name: INFO_HASH.to_owned(),
                param_value: raw_param.clone(),
                source: err,
            })
        }
        None => Err(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: INFO_HASH.to_owned(),
        }),
    }
}

fn extract_peer_id(query: &Query) -> Result<peer::Id, ParseAnnounceQueryError> {
    match query.get_param(PEER_ID) {
        Some(raw_param) => percent_decode_peer_id(&raw_param).map_err(|err| ParseAnnounceQueryError::InvalidPeerIdParam {
            param_name: PEER_ID.to_owned(),
            param_value: raw_param.clone(),
            source: err,
        }),
        None => Err(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: PEER_ID.to_owned(),
        }),
    }
}

fn extract_port(query: &Query) -> Result<u16, ParseAnnounceQueryError> {
    match query.get_param(PORT) {
        Some(raw_param) => raw_param.parse::<u16>().map_err(|_| ParseAnnounceQueryError::InvalidParam {
            param_name: PORT.to_owned(),
            param_value: raw_param.clone(),
            location: Location::caller(),
        }),
        None => Err(ParseAnnounceQueryError::MissingParam {
            location: Location::caller(),
            param_name: PORT.to_owned(),
        }),
    }
}

// Optional params

fn extract_number_of_bytes(query: &Query, param_name: &str) -> Result<u64, ParseAnnounceQueryError> {
    match query.get_param(param_name) {
        Some(raw_param) => raw_param.parse::<u64>().map_err(|_| ParseAnnounceQueryError::InvalidParam {
            param_name: param_name.to_owned(),
            param_value: raw_param.clone(),
            location: Location::caller(),
        }),
        None => Ok(0),
    }
}

fn extract_event(query: &Query) -> AnnounceEvent {
    // Any unmatched event string counts as a plain periodic announce.
    match query.get_param(EVENT) {
        Some(raw_param) => AnnounceEvent::from_query_value(&raw_param),
        None => AnnounceEvent::None,
    }
}

fn extract_numwant(query: &Query) -> Option<u32> {
    query.get_param(NUMWANT).and_then(|raw| raw.parse::<u32>().ok())
}

fn extract_compact(query: &Query) -> Result<bool, ParseAnnounceQueryError> {
    match query.get_param(COMPACT) {
        Some(raw_param) => match raw_param.as_str() {
            "1" => Ok(true),
            "0" => Ok(false),
            _ => Err(ParseAnnounceQueryError::InvalidParam {
                param_name: COMPACT.to_owned(),
                param_value: raw_param.clone(),
                location: Location::caller(),
            }),
        },
        None => Ok(false),
    }
}

/// It parses an `announce` request from a raw query string.
///
/// # Errors
///
/// Will return a `ParseAnnounceQueryError` if a mandatory param is missing
/// or a param cannot be parsed into its domain type.
pub fn parse(raw_query: Option<&str>) -> Result<Announce, ParseAnnounceQueryError> {
    let Some(raw_query) = raw_query else {
        return Err(ParseAnnounceQueryError::MissingParams {
            location: Location::caller(),
        });
    };

    let query = Query::from_str(raw_query).map_err(|_| ParseAnnounceQueryError::MissingParams {
        location: Location::caller(),
    })?;

    Announce::try_from(query)
}
