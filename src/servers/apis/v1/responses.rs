//! Response builders shared by the admin API handlers.
//!
//! Errors map onto status codes by kind: not-found to `404`, client-caused
//! to `400`, everything else to `500`.
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;

use crate::core::error::Error;

#[derive(Serialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActionStatus {
    Ok,
}

#[derive(Serialize)]
struct ActionResponse {
    status: ActionStatus,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// A `200` response acknowledging a state change.
#[must_use]
pub fn ok_response() -> Response {
    Json(ActionResponse {
        status: ActionStatus::Ok,
    })
    .into_response()
}

/// It maps a core error onto its admin status code.
#[must_use]
pub fn error_response(error: &Error) -> Response {
    let status = if error.is_not_found() {
        StatusCode::NOT_FOUND
    } else if error.is_public() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, Json(ErrorResponse { error: error.to_string() })).into_response()
}

/// A `400` for a path or body param that does not parse.
#[must_use]
pub fn invalid_param_response(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// A `200` carrying a pre-rendered JSON string.
#[must_use]
pub fn json_body_response(body: String) -> Response {
    let mut response = (StatusCode::OK, body).into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    response
}
