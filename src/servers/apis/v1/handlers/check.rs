//! The liveness probe.
//!
//! In private mode the backend is part of the serving path, so the probe
//! pings it; a public tracker with the `noop` driver always answers.
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::error;

use crate::core::Tracker;

pub async fn handle(State(tracker): State<Arc<Tracker>>) -> Response {
    if tracker.is_private() {
        if let Err(err) = tracker.backend().ping().await {
            error!("health check: backend unreachable: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    "STILL-ALIVE".into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::State;

    use super::handle;
    use crate::config::Configuration;
    use crate::core::{statistics, Tracker};

    #[tokio::test]
    async fn it_should_answer_still_alive() {
        let tracker = Arc::new(Tracker::new(&Configuration::default(), None, statistics::Repo::new()).unwrap());

        let response = handle(State(tracker)).await;

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"STILL-ALIVE");
    }
}
