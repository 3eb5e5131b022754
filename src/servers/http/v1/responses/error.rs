//! `Error` response for the HTTP tracker.
//!
//! Tracker error responses are bencoded dictionaries with a single
//! `failure reason` key and always ship with a `200 OK` status code;
//! transport-level status codes are reserved for transport failures.
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::core::error;
use crate::network;
use crate::servers::http::v1::requests::announce::ParseAnnounceQueryError;
use crate::servers::http::v1::requests::scrape::ParseScrapeQueryError;
use crate::servers::http::v1::services::peer_addr_resolver::PeerAddrResolutionError;

/// `Error` response for the HTTP tracker.
#[derive(Serialize, Debug, PartialEq)]
pub struct Error {
    /// Human readable string which explains why the request failed.
    #[serde(rename = "failure reason")]
    pub failure_reason: String,
}

impl Error {
    /// Returns the bencoded representation of the `Error` struct.
    ///
    /// ```rust
    /// use shroud_tracker::servers::http::v1::responses::error::Error;
    ///
    /// let err = Error {
    ///    failure_reason: "error message".to_owned(),
    /// };
    ///
    /// // cspell:disable-next-line
    /// assert_eq!(err.write(), "d14:failure reason13:error messagee");
    /// ```
    ///
    /// # Panics
    ///
    /// It would panic if the `Error` struct contained an inappropriate field
    /// type.
    #[must_use]
    pub fn write(&self) -> String {
        serde_bencode::to_string(&self).unwrap()
    }

    /// Whether this failure counts as a client error in the stats, rather
    /// than a server-side one.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.failure_reason != error::Error::Internal.to_string()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        (StatusCode::OK, self.write()).into_response()
    }
}

impl From<error::Error> for Error {
    fn from(err: error::Error) -> Self {
        // Only the public kinds travel verbatim; everything else collapses
        // to a generic message at this edge.
        let failure_reason = if err.is_public() {
            err.to_string()
        } else {
            error::Error::Internal.to_string()
        };
        Self { failure_reason }
    }
}

impl From<ParseAnnounceQueryError> for Error {
    fn from(_: ParseAnnounceQueryError) -> Self {
        Self {
            failure_reason: error::Error::MalformedRequest.to_string(),
        }
    }
}

impl From<ParseScrapeQueryError> for Error {
    fn from(_: ParseScrapeQueryError) -> Self {
        Self {
            failure_reason: error::Error::MalformedRequest.to_string(),
        }
    }
}

impl From<network::Error> for Error {
    fn from(_: network::Error) -> Self {
        // Address resolution happens while the request is being understood;
        // its failures read as malformed requests to clients.
        Self {
            failure_reason: error::Error::MalformedRequest.to_string(),
        }
    }
}

impl From<PeerAddrResolutionError> for Error {
    fn from(_: PeerAddrResolutionError) -> Self {
        Self {
            failure_reason: error::Error::MalformedRequest.to_string(),
        }
    }
}
