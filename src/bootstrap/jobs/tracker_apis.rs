//! Job that starts the admin API.
use std::sync::Arc;
use std::time::Duration;

use log::error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::config::HttpApi;
use crate::core::Tracker;
use crate::servers::apis::server;

/// It binds the admin API listener and spawns the serve loop.
///
/// # Errors
///
/// Will return an `std::io::Error` if the listener cannot be bound.
pub async fn start_job(config: &HttpApi, tracker: Arc<Tracker>) -> Result<JoinHandle<()>, std::io::Error> {
    let listener = TcpListener::bind(&config.bind_address).await?;

    let request_timeout = Duration::from_secs(config.request_timeout.max(1));

    Ok(tokio::spawn(async move {
        if let Err(err) = server::serve(listener, tracker, request_timeout, shutdown_signal()).await {
            error!("admin API stopped: {err}");
        }
    }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    log::info!("Stopping admin API..");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::start_job;
    use crate::config::Configuration;
    use crate::core::{statistics, Tracker};

    #[tokio::test]
    async fn it_should_bind_and_serve_on_an_ephemeral_port() {
        let mut configuration = Configuration::default();
        configuration.http_api.bind_address = "127.0.0.1:0".to_string();

        let tracker = Arc::new(Tracker::new(&configuration, None, statistics::Repo::new()).unwrap());

        let handle = start_job(&configuration.http_api, tracker).await.unwrap();

        assert!(!handle.is_finished());
        handle.abort();
    }
}
