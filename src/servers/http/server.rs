//! The HTTP tracker server loop.
//!
//! One serve loop covers every transport: the network abstraction's
//! [`Listener`](crate::network::Listener) is adapted to axum's listener
//! contract, so clearnet sockets and SAM-tunnelled streams are served by the
//! same router.
use std::sync::Arc;
use std::time::Duration;

use axum::extract::connect_info::Connected;
use axum::serve::IncomingStream;
use log::{error, info};

use super::v1::routes::router;
use super::HttpTrackerServices;
use crate::network::{Listener, RemoteAddr};

impl axum::serve::Listener for Listener {
    type Io = tokio::net::TcpStream;
    type Addr = RemoteAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            match Listener::accept(self).await {
                Ok((stream, remote_addr)) => return (stream, remote_addr),
                Err(err) => {
                    // Transient accept failures (bridge hiccups, fd
                    // exhaustion) must not kill the serve loop.
                    error!("http tracker: accept failed: {err}");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
        }
    }

    fn local_addr(&self) -> std::io::Result<Self::Addr> {
        Ok(RemoteAddr(self.local_addr_string()))
    }
}

impl Connected<IncomingStream<'_, Listener>> for RemoteAddr {
    fn connect_info(stream: IncomingStream<'_, Listener>) -> Self {
        stream.remote_addr().clone()
    }
}

/// It serves the HTTP tracker on an already-bound listener until the
/// shutdown future resolves.
///
/// # Errors
///
/// Will return an `std::io::Error` if serving fails.
pub async fn serve(
    listener: Listener,
    services: Arc<HttpTrackerServices>,
    request_timeout: Duration,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    info!("HTTP tracker listening on {}", listener.local_addr_string());

    let app = router(services, request_timeout);

    axum::serve(listener, app.into_make_service_with_connect_info::<RemoteAddr>())
        .with_graceful_shutdown(shutdown)
        .await
}
