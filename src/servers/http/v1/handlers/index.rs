//! The index page: a plain-text usage note advertising the public announce
//! URL of this tracker instance.
use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};

use crate::servers::http::HttpTrackerServices;

#[allow(clippy::unused_async)]
pub async fn handle(State(services): State<Arc<HttpTrackerServices>>) -> Response {
    let addr = services.public_addr.clone();

    let body = format!(
        "bittorrent open tracker announce url http://{addr}/announce\n\
         to use:\n\nmktorrent -a http://{addr}/announce somedirectory\n"
    );

    body.into_response()
}
