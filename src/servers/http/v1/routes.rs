//! Routes for the HTTP tracker.
//!
//! - `GET /`: the plain-text index page.
//! - `GET /announce`, `GET /announce/{passkey}`
//! - `GET /scrape`, `GET /scrape/{passkey}`
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use super::handlers::{announce, index, scrape};
use crate::servers::http::HttpTrackerServices;

/// It builds the HTTP tracker router with the per-request deadline applied.
#[must_use]
pub fn router(services: Arc<HttpTrackerServices>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/", get(index::handle))
        .route("/announce", get(announce::handle_without_key))
        .route("/announce/{passkey}", get(announce::handle_with_key))
        .route("/scrape", get(scrape::handle_without_key))
        .route("/scrape/{passkey}", get(scrape::handle_with_key))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(services)
}
