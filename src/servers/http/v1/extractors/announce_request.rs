//! Axum extractor for the `announce` request.
//!
//! It parses the URL query into an
//! [`Announce`](crate::servers::http::v1::requests::announce::Announce),
//! rejecting with a bencoded `failure reason` when the query is missing or
//! malformed.
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::servers::http::v1::requests::announce::{self, Announce};
use crate::servers::http::v1::responses;

pub struct ExtractRequest(pub Announce);

impl<S> FromRequestParts<S> for ExtractRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match announce::parse(parts.uri.query()) {
            Ok(request) => Ok(ExtractRequest(request)),
            Err(error) => Err(responses::error::Error::from(error).into_response()),
        }
    }
}
