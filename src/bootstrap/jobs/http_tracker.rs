//! Job that starts the HTTP tracker over the selected network transport.
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use tokio::task::JoinHandle;

use crate::config::HttpTracker;
use crate::core::Tracker;
use crate::network::Network;
use crate::servers::http::{server, HttpTrackerServices};

/// It binds the tracker listener through the transport, resolves the public
/// address for the index page, and spawns the serve loop.
///
/// # Errors
///
/// Will return a `crate::network::Error` if the listener cannot be bound.
pub async fn start_job(
    config: &HttpTracker,
    tracker: Arc<Tracker>,
    network: Arc<dyn Network>,
    real_ip_header: Option<String>,
) -> Result<JoinHandle<()>, crate::network::Error> {
    let listener = network.listen(&config.bind_address).await?;

    let public_addr = match network.public_addr(&listener).await {
        Ok(addr) => addr,
        Err(err) => {
            // The index page degrades to the bind address; announces are
            // unaffected.
            error!("http tracker: cannot resolve public address: {err}");
            listener.local_addr_string()
        }
    };
    info!("http tracker public address: {public_addr}");

    let services = Arc::new(HttpTrackerServices::with_shared(
        tracker,
        network,
        real_ip_header,
        public_addr,
    ));

    let request_timeout = Duration::from_secs(config.request_timeout.max(1));

    Ok(tokio::spawn(async move {
        if let Err(err) = server::serve(listener, services, request_timeout, shutdown_signal()).await {
            error!("http tracker stopped: {err}");
        }
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    log::info!("Stopping HTTP tracker..");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::start_job;
    use crate::config::Configuration;
    use crate::core::{statistics, Tracker};
    use crate::network;

    #[tokio::test]
    async fn it_should_bind_and_serve_on_an_ephemeral_port() {
        let mut configuration = Configuration::default();
        configuration.http_tracker.bind_address = "127.0.0.1:0".to_string();

        let tracker = Arc::new(Tracker::new(&configuration, None, statistics::Repo::new()).unwrap());
        let net = network::build(&configuration.network).unwrap();

        let handle = start_job(&configuration.http_tracker, tracker, net, None).await.unwrap();

        assert!(!handle.is_finished());
        handle.abort();
    }
}
