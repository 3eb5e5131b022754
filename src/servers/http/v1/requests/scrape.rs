//! `Scrape` request for the HTTP tracker.
use std::panic::Location;
use std::str::FromStr;

use thiserror::Error;

use crate::servers::http::percent_encoding::percent_decode_info_hash;
use crate::servers::http::v1::query::Query;
use crate::shared::bit_torrent::info_hash::InfoHash;

const INFO_HASH: &str = "info_hash";

/// The parsed `scrape` request: one infohash per `info_hash` query param.
#[derive(Debug, PartialEq)]
pub struct Scrape {
    pub info_hashes: Vec<InfoHash>,
}

/// Errors that can occur when parsing the `Scrape` request.
#[derive(Error, Debug)]
pub enum ParseScrapeQueryError {
    #[error("missing query params for scrape request in {location}")]
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
}

impl TryFrom<Query> for Scrape {
    type Error = ParseScrapeQueryError;

    fn try_from(query: Query) -> Result<Self, Self::Error> {
        let Some(raw_params) = query.get_param_vec(INFO_HASH) else {
            return Err(ParseScrapeQueryError::MissingParam {
                location: Location::caller(),
                param_name: INFO_HASH.to_owned(),
            });
        };

        let mut info_hashes = Vec::with_capacity(raw_params.len());
        for raw_param in raw_params {
            let info_hash =
                percent_decode_info_hash(&raw_param).map_err(|_| ParseScrapeQueryError::InvalidParam {
                    param_name: INFO_HASH.to_owned(),
                    param_value: raw_param.clone(),
                    location: Location::caller(),
                })?;
            info_hashes.push(info_hash);
        }

        Ok(Self { info_hashes })
    }
}

/// It parses a `scrape` request from a raw query string.
///
/// # Errors
///
/// Will return a `ParseScrapeQueryError` if no valid `info_hash` param is
/// present.
pub fn parse(raw_query: Option<&str>) -> Result<Scrape, ParseScrapeQueryError> {
    let Some(raw_query) = raw_query else {
        return Err(ParseScrapeQueryError::MissingParams {
            location: Location::caller(),
        });
    };

    let query = Query::from_str(raw_query).map_err(|_| ParseScrapeQueryError::MissingParams {
        location: Location::caller(),
    })?;

    Scrape::try_from(query)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use crate::servers::http::v1::requests::scrape::parse;
    use crate::shared::bit_torrent::info_hash::InfoHash;

    #[test]
    fn it_should_parse_a_single_infohash() {
        let scrape = parse(Some("info_hash=%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0")).unwrap();

        assert_eq!(
            scrape.info_hashes,
            vec![InfoHash::from_str("3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0").unwrap()]
        );
    }

    #[test]
    fn it_should_parse_multiple_infohashes() {
        let scrape = parse(Some(
            "info_hash=%3B%24U%04%CF%5F%11%BB%DB%E1%20%1C%EAjk%F4Z%EE%1B%C0\
             &info_hash=%99%99%99%99%99%99%99%99%99%99%99%99%99%99%99%99%99%99%99%99",
        ))
        .unwrap();

        assert_eq!(scrape.info_hashes.len(), 2);
        assert_eq!(scrape.info_hashes[1], InfoHash([0x99; 20]));
    }

    #[test]
    fn it_should_fail_without_any_infohash() {
        assert!(parse(Some("numwant=50")).is_err());
        assert!(parse(None).is_err());
    }

    #[test]
    fn it_should_fail_with_a_malformed_infohash() {
        assert!(parse(Some("info_hash=tooshort")).is_err());
    }
}
