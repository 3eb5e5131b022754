//! The HTTP tracker: the announce/scrape delivery layer.
//!
//! It runs over whatever [`Network`](crate::network::Network) transport the
//! process selected at startup; the handlers only ever see the transport
//! through that interface.
pub mod percent_encoding;
pub mod server;
pub mod v1;

use std::sync::Arc;

use axum::http::HeaderMap;

use crate::config::Configuration;
use crate::core::services::tracker_factory;
use crate::core::Tracker;
use crate::network::{self, Network, RemoteAddr};

/// Everything the HTTP tracker handlers need, shared as axum state.
pub struct HttpTrackerServices {
    pub tracker: Arc<Tracker>,
    pub network: Arc<dyn Network>,
    /// Header carrying the client address behind a reverse proxy, when
    /// configured.
    pub real_ip_header: Option<String>,
    /// The address advertised on the index page, resolved at server start.
    pub public_addr: String,
}

impl HttpTrackerServices {
    /// It wires a fresh tracker and transport from the configuration.
    ///
    /// # Errors
    ///
    /// Will return a `network::Error` if the configured transport cannot be
    /// built.
    pub fn new(config: &Configuration) -> Result<Self, network::Error> {
        let tracker = Arc::new(tracker_factory(config));
        let network = network::build(&config.network)?;

        Ok(Self {
            tracker,
            network,
            real_ip_header: config.core.real_ip_header.clone(),
            public_addr: String::new(),
        })
    }

    #[must_use]
    pub fn with_shared(
        tracker: Arc<Tracker>,
        network: Arc<dyn Network>,
        real_ip_header: Option<String>,
        public_addr: String,
    ) -> Self {
        Self {
            tracker,
            network,
            real_ip_header,
            public_addr,
        }
    }

    /// The raw client address for a request: the configured real-IP header
    /// when present, the connection address otherwise.
    #[must_use]
    pub fn client_addr(&self, headers: &HeaderMap, remote_addr: &RemoteAddr) -> String {
        if let Some(header_name) = &self.real_ip_header {
            if let Some(value) = headers.get(header_name).and_then(|value| value.to_str().ok()) {
                if !value.is_empty() {
                    return value.to_string();
                }
            }
        }
        remote_addr.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderMap;

    use crate::config::Configuration;
    use crate::network::RemoteAddr;
    use crate::servers::http::HttpTrackerServices;

    #[tokio::test]
    async fn it_should_fall_back_to_the_connection_address() {
        let services = HttpTrackerServices::new(&Configuration::default()).unwrap();

        let addr = services.client_addr(&HeaderMap::new(), &RemoteAddr("126.0.0.1:6881".to_string()));

        assert_eq!(addr, "126.0.0.1:6881");
    }

    #[tokio::test]
    async fn it_should_use_the_real_ip_header_when_configured_and_present() {
        let mut configuration = Configuration::default();
        configuration.core.real_ip_header = Some("X-Real-IP".to_string());
        let services = HttpTrackerServices::new(&configuration).unwrap();

        let mut headers = HeaderMap::new();
        headers.insert("X-Real-IP", "126.0.0.9".parse().unwrap());

        let addr = services.client_addr(&headers, &RemoteAddr("127.0.0.1:6881".to_string()));

        assert_eq!(addr, "126.0.0.9");
    }
}
