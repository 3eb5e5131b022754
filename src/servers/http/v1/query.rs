//! The `Query` struct used to parse and store the URL query parameters.
//!
//! Values are kept percent-encoded: the binary params (`info_hash`,
//! `peer_id`) must be decoded as raw bytes, not as UTF-8 strings, so
//! decoding is deferred to the request parsers.
use std::panic::Location;
use std::str::FromStr;

use multimap::MultiMap;
use thiserror::Error;

type ParamName = String;

/// It represents a URL query component, with support for repeated params
/// (`info_hash` appears once per torrent in scrape requests).
#[derive(Debug)]
pub struct Query {
    params: MultiMap<ParamName, NameValuePair>,
}

impl Query {
    /// It returns the first value for a param, if the param is present.
    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<String> {
        self.params.get(name).map(|pair| pair.value.clone())
    }

    /// It returns all the values for a param.
    #[must_use]
    pub fn get_param_vec(&self, name: &str) -> Option<Vec<String>> {
        self.params
            .get_vec(name)
            .map(|pairs| pairs.iter().map(|pair| pair.value.clone()).collect())
    }
}

/// This error can be returned when parsing a [`Query`] from a string.
#[derive(Error, Debug)]
pub enum ParseQueryError {
    /// Invalid URL query param. For example: `"name=value=value"`.
    #[error("invalid param {raw_param} in {location}")]
    InvalidParam {
        location: &'static Location<'static>,
        raw_param: String,
    },
}

impl FromStr for Query {
    type Err = ParseQueryError;

    fn from_str(raw_query: &str) -> Result<Self, Self::Err> {
        let mut params: MultiMap<ParamName, NameValuePair> = MultiMap::new();

        for raw_param in raw_query.trim().trim_start_matches('?').split('&') {
            let pair: NameValuePair = raw_param.parse()?;
            let param_name = pair.name.clone();
            params.insert(param_name, pair);
        }

        Ok(Self { params })
    }
}

#[derive(Debug, Clone)]
struct NameValuePair {
    name: String,
    value: String,
}

impl FromStr for NameValuePair {
    type Err = ParseQueryError;

    fn from_str(raw_param: &str) -> Result<Self, Self::Err> {
        let mut parts = raw_param.split('=');

        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(value), None) if !name.is_empty() => Ok(Self {
                name: name.to_string(),
                value: value.to_string(),
            }),
            (Some(name), None, _) if !name.is_empty() => Ok(Self {
                name: name.to_string(),
                value: String::new(),
            }),
            _ => Err(ParseQueryError::InvalidParam {
                location: Location::caller(),
                raw_param: raw_param.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::servers::http::v1::query::Query;

    #[test]
    fn it_should_parse_a_single_param() {
        let query = "param1=value1".parse::<Query>().unwrap();

        assert_eq!(query.get_param("param1").unwrap(), "value1");
    }

    #[test]
    fn it_should_return_the_first_value_of_a_repeated_param() {
        let query = "param1=value1&param1=value2".parse::<Query>().unwrap();

        assert_eq!(query.get_param("param1").unwrap(), "value1");
    }

    #[test]
    fn it_should_return_all_values_of_a_repeated_param() {
        let query = "param1=value1&param1=value2".parse::<Query>().unwrap();

        assert_eq!(
            query.get_param_vec("param1"),
            Some(vec!["value1".to_string(), "value2".to_string()])
        );
    }

    #[test]
    fn it_should_ignore_a_leading_question_mark() {
        let query = "?param1=value1".parse::<Query>().unwrap();

        assert_eq!(query.get_param("param1").unwrap(), "value1");
    }

    #[test]
    fn it_should_parse_a_flag_param_without_a_value() {
        let query = "compact=1&no_peer_id".parse::<Query>().unwrap();

        assert_eq!(query.get_param("no_peer_id").unwrap(), "");
    }

    #[test]
    fn it_should_reject_a_param_with_an_unescaped_equals_sign() {
        assert!("param1=value1=value2".parse::<Query>().is_err());
    }

    #[test]
    fn it_should_keep_values_percent_encoded() {
        let query = "info_hash=%3B%24U".parse::<Query>().unwrap();

        assert_eq!(query.get_param("info_hash").unwrap(), "%3B%24U");
    }
}
