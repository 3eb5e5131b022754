//! The admin API server loop.
//!
//! The API listens on plain TCP: it is operator-facing and meant for a
//! private interface, not for the overlay.
use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::net::TcpListener;

use super::v1::routes::router;
use crate::core::Tracker;

/// It serves the admin API on an already-bound listener until the shutdown
/// future resolves.
///
/// # Errors
///
/// Will return an `std::io::Error` if serving fails.
pub async fn serve(
    listener: TcpListener,
    tracker: Arc<Tracker>,
    request_timeout: Duration,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("admin API listening on {addr}");
    }

    let app = router(tracker, request_timeout);

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await
}
