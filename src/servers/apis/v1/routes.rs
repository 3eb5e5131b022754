//! Admin API routes.
//!
//! - `GET /check`
//! - `GET /stats[?pretty][&flatten]`
//! - `GET /torrents`, `GET/PUT/DELETE /torrents/{infohash}`
//! - `GET/PUT/DELETE /users/{passkey}`
//! - `GET/PUT/DELETE /clients/{clientID}`
//! - `GET /categories`
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tower_http::timeout::TimeoutLayer;

use super::handlers::{categories, check, clients, stats, torrents, users};
use crate::core::Tracker;

/// It builds the admin API router with the per-request deadline applied.
#[must_use]
pub fn router(tracker: Arc<Tracker>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/check", get(check::handle))
        .route("/stats", get(stats::handle))
        .route("/torrents", get(stats::handle_torrent_list))
        .route(
            "/torrents/{infohash}",
            get(torrents::get_torrent)
                .put(torrents::put_torrent)
                .delete(torrents::delete_torrent),
        )
        .route(
            "/users/{passkey}",
            get(users::get_user).put(users::put_user).delete(users::delete_user),
        )
        .route(
            "/clients/{client_id}",
            get(clients::get_client)
                .put(clients::put_client)
                .delete(clients::delete_client),
        )
        .route("/categories", get(categories::list_categories))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(tracker)
}
