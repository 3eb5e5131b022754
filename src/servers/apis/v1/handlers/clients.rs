//! Admin handlers for the client whitelist.
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::core::whitelist::ClientId;
use crate::core::Tracker;
use crate::servers::apis::v1::responses::{invalid_param_response, ok_response};

pub async fn get_client(State(tracker): State<Arc<Tracker>>, Path(client_id): Path<String>) -> Response {
    let Ok(client_id) = ClientId::from_str(&client_id) else {
        return invalid_param_response("client id must be exactly 6 characters");
    };

    if tracker.whitelist.contains(&client_id).await {
        StatusCode::OK.into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

pub async fn put_client(State(tracker): State<Arc<Tracker>>, Path(client_id): Path<String>) -> Response {
    let Ok(client_id) = ClientId::from_str(&client_id) else {
        return invalid_param_response("client id must be exactly 6 characters");
    };

    tracker.whitelist.add(client_id).await;
    ok_response()
}

pub async fn delete_client(State(tracker): State<Arc<Tracker>>, Path(client_id): Path<String>) -> Response {
    let Ok(client_id) = ClientId::from_str(&client_id) else {
        return invalid_param_response("client id must be exactly 6 characters");
    };

    tracker.whitelist.remove(&client_id).await;
    ok_response()
}
