//! Axum handlers for the `announce` request.
//!
//! The handler resolves the client's transport address, attaches the
//! path-carried passkey when present, and delegates to the core tracker.
//! Failures surface as bencoded `failure reason` responses; outcomes and
//! latency feed the stats pipeline.
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{ConnectInfo, Path, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use log::debug;

use crate::core::auth::Passkey;
use crate::core::peer::PeerEndpoint;
use crate::core::{self, statistics, AnnounceData};
use crate::network::RemoteAddr;
use crate::servers::http::v1::extractors::announce_request::ExtractRequest;
use crate::servers::http::v1::requests::announce::Announce;
use crate::servers::http::v1::responses::{self, announce};
use crate::servers::http::v1::services::peer_addr_resolver;
use crate::servers::http::HttpTrackerServices;

#[allow(clippy::unused_async)]
pub async fn handle_without_key(
    State(services): State<Arc<HttpTrackerServices>>,
    ExtractRequest(request): ExtractRequest,
    ConnectInfo(remote_addr): ConnectInfo<RemoteAddr>,
    headers: HeaderMap,
) -> Response {
    debug!("http announce request: {request:#?}");

    handle(&services, &request, &remote_addr, &headers, None).await
}

#[allow(clippy::unused_async)]
pub async fn handle_with_key(
    State(services): State<Arc<HttpTrackerServices>>,
    Path(passkey): Path<String>,
    ExtractRequest(request): ExtractRequest,
    ConnectInfo(remote_addr): ConnectInfo<RemoteAddr>,
    headers: HeaderMap,
) -> Response {
    debug!("http announce request with passkey: {request:#?}");

    handle(&services, &request, &remote_addr, &headers, Some(passkey)).await
}

async fn handle(
    services: &Arc<HttpTrackerServices>,
    request: &Announce,
    remote_addr: &RemoteAddr,
    headers: &HeaderMap,
    maybe_passkey: Option<String>,
) -> Response {
    let start = Instant::now();

    let response = match handle_announce(services, request, remote_addr, headers, maybe_passkey).await {
        Ok(announce_data) => {
            services.tracker.send_stats_event(statistics::Event::HandledRequest).await;
            announce::build_response(announce_data)
        }
        Err(error) => {
            let event = if error.is_client_error() {
                statistics::Event::ClientError
            } else {
                statistics::Event::ErroredRequest
            };
            services.tracker.send_stats_event(event).await;
            error.into_response()
        }
    };

    services.tracker.send_stats_timing(start.elapsed()).await;

    response
}

async fn handle_announce(
    services: &Arc<HttpTrackerServices>,
    request: &Announce,
    remote_addr: &RemoteAddr,
    headers: &HeaderMap,
    maybe_passkey: Option<String>,
) -> Result<AnnounceData, responses::error::Error> {
    let passkey = match maybe_passkey {
        Some(raw) => Some(Passkey::from_str(&raw).map_err(|_| responses::error::Error::from(core::error::Error::InvalidPasskey))?),
        None => None,
    };

    let raw_addr = services.client_addr(headers, remote_addr);
    let peer_addr = peer_addr_resolver::invoke(&services.network, &raw_addr).await?;

    let announce = core::Announce {
        info_hash: request.info_hash,
        peer_id: request.peer_id,
        endpoint: PeerEndpoint {
            addr: peer_addr,
            port: request.port,
        },
        uploaded: request.uploaded,
        downloaded: request.downloaded,
        left: request.left,
        event: request.event,
        numwant: request.numwant,
        compact: request.compact,
        passkey,
    };

    services.tracker.announce(&announce).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::HeaderMap;

    use super::handle_announce;
    use crate::config::Configuration;
    use crate::core::peer::AnnounceEvent;
    use crate::network::RemoteAddr;
    use crate::servers::http::v1::requests::announce::Announce;
    use crate::servers::http::HttpTrackerServices;
    use crate::shared::bit_torrent::info_hash::InfoHash;

    fn services(configuration: &Configuration) -> Arc<HttpTrackerServices> {
        Arc::new(HttpTrackerServices::new(configuration).unwrap())
    }

    fn sample_request() -> Announce {
        Announce {
            info_hash: "3b245504cf5f11bbdbe1201cea6a6bf45aee1bc0".parse::<InfoHash>().unwrap(),
            peer_id: crate::core::peer::Id(*b"-qB00000000000000001"),
            port: 17548,
            uploaded: 0,
            downloaded: 0,
            left: 0,
            event: AnnounceEvent::Started,
            numwant: None,
            compact: false,
        }
    }

    #[tokio::test]
    async fn it_should_answer_an_announce_over_clearnet() {
        let services = services(&Configuration::default());

        let announce_data = handle_announce(
            &services,
            &sample_request(),
            &RemoteAddr("126.0.0.1:49152".to_string()),
            &HeaderMap::new(),
            None,
        )
        .await
        .unwrap();

        assert_eq!(announce_data.stats.complete, 1);
    }

    #[tokio::test]
    async fn it_should_fail_when_the_client_address_cannot_be_resolved() {
        let services = services(&Configuration::default());

        let error = handle_announce(
            &services,
            &sample_request(),
            &RemoteAddr("not an address".to_string()),
            &HeaderMap::new(),
            None,
        )
        .await
        .unwrap_err();

        assert_eq!(error.failure_reason, "malformed request");
    }

    #[tokio::test]
    async fn it_should_fail_with_a_malformed_passkey() {
        let mut configuration = Configuration::default();
        configuration.core.private_enabled = true;
        let services = services(&configuration);

        let error = handle_announce(
            &services,
            &sample_request(),
            &RemoteAddr("126.0.0.1:49152".to_string()),
            &HeaderMap::new(),
            Some("not-a-passkey".to_string()),
        )
        .await
        .unwrap_err();

        assert_eq!(error.failure_reason, "passkey is invalid");
    }

    #[tokio::test]
    async fn it_should_prefer_the_configured_real_ip_header() {
        let mut configuration = Configuration::default();
        configuration.core.real_ip_header = Some("X-Forwarded-For".to_string());
        let services = services(&configuration);

        let mut headers = HeaderMap::new();
        headers.insert("X-Forwarded-For", "126.0.0.9".parse().unwrap());

        handle_announce(
            &services,
            &sample_request(),
            &RemoteAddr("127.0.0.1:49152".to_string()),
            &headers,
            None,
        )
        .await
        .unwrap();

        let snapshot = services.tracker.find_torrent(&sample_request().info_hash).unwrap();
        let peer = snapshot.swarm.seeders.values().next().unwrap();
        assert_eq!(peer.endpoint.addr.to_string(), "126.0.0.9");
    }
}
