//! Axum handlers for the `scrape` request.
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use log::debug;

use crate::core::auth::Passkey;
use crate::core::{self, statistics, ScrapeData};
use crate::servers::http::v1::extractors::scrape_request::ExtractRequest;
use crate::servers::http::v1::requests::scrape::Scrape;
use crate::servers::http::v1::responses::{self, scrape};
use crate::servers::http::HttpTrackerServices;

#[allow(clippy::unused_async)]
pub async fn handle_without_key(
    State(services): State<Arc<HttpTrackerServices>>,
    ExtractRequest(request): ExtractRequest,
) -> Response {
    debug!("http scrape request: {request:#?}");

    handle(&services, &request, None).await
}

#[allow(clippy::unused_async)]
pub async fn handle_with_key(
    State(services): State<Arc<HttpTrackerServices>>,
    Path(passkey): Path<String>,
    ExtractRequest(request): ExtractRequest,
) -> Response {
    debug!("http scrape request with passkey: {request:#?}");

    handle(&services, &request, Some(passkey)).await
}

async fn handle(services: &Arc<HttpTrackerServices>, request: &Scrape, maybe_passkey: Option<String>) -> Response {
    let start = Instant::now();

    let response = match handle_scrape(services, request, maybe_passkey).await {
        Ok(scrape_data) => {
            services.tracker.send_stats_event(statistics::Event::HandledRequest).await;
            scrape::Bencoded::from(scrape_data).into_response()
        }
        Err(error) => {
            let event = if error.is_client_error() {
                statistics::Event::ClientError
            } else {
                statistics::Event::ErroredRequest
            };
            services.tracker.send_stats_event(event).await;
            error.into_response()
        }
    };

    services.tracker.send_stats_timing(start.elapsed()).await;

    response
}

async fn handle_scrape(
    services: &Arc<HttpTrackerServices>,
    request: &Scrape,
    maybe_passkey: Option<String>,
) -> Result<ScrapeData, responses::error::Error> {
    let passkey = match maybe_passkey {
        Some(raw) => Some(Passkey::from_str(&raw).map_err(|_| responses::error::Error::from(core::error::Error::InvalidPasskey))?),
        None => None,
    };

    let scrape = core::Scrape {
        passkey,
        info_hashes: request.info_hashes.clone(),
    };

    services.tracker.scrape(&scrape).await.map_err(Into::into)
}
