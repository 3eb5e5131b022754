//! The category listing, backed by the driver.
use std::sync::Arc;

use axum::extract::State;
use axum::response::Response;
use log::error;

use crate::core::Tracker;
use crate::servers::apis::v1::responses::{error_response, json_body_response};

pub async fn list_categories(State(tracker): State<Arc<Tracker>>) -> Response {
    match tracker.backend().categories().await {
        Ok(categories) => match serde_json::to_string(&categories) {
            Ok(body) => json_body_response(body),
            Err(_) => error_response(&crate::core::error::Error::Internal),
        },
        Err(err) => {
            error!("backend: failed to list categories: {err}");
            error_response(&crate::core::error::Error::Internal)
        }
    }
}
