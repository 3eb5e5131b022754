//! Admin handlers for the torrent catalog.
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;

use crate::core::swarm::TorrentInfo;
use crate::core::Tracker;
use crate::servers::apis::v1::responses::{error_response, invalid_param_response, json_body_response, ok_response};
use crate::shared::bit_torrent::info_hash::InfoHash;

/// The body of `PUT /torrents/{infohash}`: index metadata is optional.
#[derive(Deserialize, Debug, Default)]
pub struct TorrentForm {
    #[serde(default)]
    pub info: Option<TorrentInfo>,
}

pub async fn get_torrent(State(tracker): State<Arc<Tracker>>, Path(infohash): Path<String>) -> Response {
    let Ok(info_hash) = InfoHash::from_str(&infohash) else {
        return invalid_param_response("invalid infohash");
    };

    match tracker.find_torrent(&info_hash) {
        Ok(snapshot) => match serde_json::to_string(&snapshot) {
            Ok(body) => json_body_response(body),
            Err(_) => error_response(&crate::core::error::Error::Internal),
        },
        Err(error) => error_response(&error),
    }
}

pub async fn put_torrent(
    State(tracker): State<Arc<Tracker>>,
    Path(infohash): Path<String>,
    Json(form): Json<TorrentForm>,
) -> Response {
    let Ok(info_hash) = InfoHash::from_str(&infohash) else {
        return invalid_param_response("invalid infohash");
    };

    tracker.put_torrent(&info_hash, form.info).await;

    ok_response()
}

pub async fn delete_torrent(State(tracker): State<Arc<Tracker>>, Path(infohash): Path<String>) -> Response {
    let Ok(info_hash) = InfoHash::from_str(&infohash) else {
        return invalid_param_response("invalid infohash");
    };

    match tracker.delete_torrent(&info_hash).await {
        Ok(()) => ok_response(),
        Err(error) => error_response(&error),
    }
}
