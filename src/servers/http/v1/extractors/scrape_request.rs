//! Axum extractor for the `scrape` request.
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::servers::http::v1::requests::scrape::{self, Scrape};
use crate::servers::http::v1::responses;

pub struct ExtractRequest(pub Scrape);

impl<S> FromRequestParts<S> for ExtractRequest
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match scrape::parse(parts.uri.query()) {
            Ok(request) => Ok(ExtractRequest(request)),
            Err(error) => Err(responses::error::Error::from(error).into_response()),
        }
    }
}
