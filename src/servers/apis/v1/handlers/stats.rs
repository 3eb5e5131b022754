//! The stats endpoint.
//!
//! `GET /stats` renders the nested metrics snapshot, `?flatten` the dotted
//! key/value view, `?pretty` indents either.
use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Response;

use crate::core::services::torrent::Pagination;
use crate::core::{statistics, Tracker};
use crate::servers::apis::v1::responses::{invalid_param_response, json_body_response};

pub async fn handle(State(tracker): State<Arc<Tracker>>, Query(params): Query<HashMap<String, String>>) -> Response {
    let mut snapshot = {
        let metrics = tracker.get_stats().await;
        serde_json::to_value(&*metrics).expect("metrics are serializable")
    };

    // Store-derived gauges join the counter snapshot.
    let store_metrics = tracker.swarms.metrics();
    if let serde_json::Value::Object(map) = &mut snapshot {
        map.insert(
            "torrents".to_string(),
            serde_json::to_value(store_metrics).expect("store metrics are serializable"),
        );
    }

    let value = if params.contains_key("flatten") {
        serde_json::Value::Object(statistics::flatten(&snapshot))
    } else {
        snapshot
    };

    let rendered = if params.contains_key("pretty") {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };

    match rendered {
        Ok(body) => json_body_response(body),
        Err(_) => invalid_param_response("cannot render stats"),
    }
}

/// `GET /torrents`: one row per swarm, paginated.
pub async fn handle_torrent_list(State(tracker): State<Arc<Tracker>>, pagination: Query<Pagination>) -> Response {
    let rows = crate::core::services::torrent::get_torrents(&tracker, &pagination.0);

    match serde_json::to_string(&rows) {
        Ok(body) => json_body_response(body),
        Err(_) => invalid_param_response("cannot render torrent list"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::extract::{Query, State};
    use axum::response::Response;

    use super::handle;
    use crate::config::Configuration;
    use crate::core::{statistics, Tracker};

    fn tracker() -> Arc<Tracker> {
        Arc::new(Tracker::new(&Configuration::default(), None, statistics::Repo::new()).unwrap())
    }

    async fn body_of(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn it_should_render_the_nested_snapshot_by_default() {
        let response = handle(State(tracker()), Query(HashMap::new())).await;

        let body = body_of(response).await;

        assert!(body.contains("\"trackerAnnounces\":0"));
        assert!(body.contains("\"peers\""));
    }

    #[tokio::test]
    async fn it_should_render_dotted_keys_when_flattened() {
        let mut params = HashMap::new();
        params.insert("flatten".to_string(), String::new());

        let response = handle(State(tracker()), Query(params)).await;

        let body = body_of(response).await;

        assert!(body.contains("\"peers.seeds.current\":0"));
    }

    #[tokio::test]
    async fn it_should_indent_when_pretty() {
        let mut params = HashMap::new();
        params.insert("pretty".to_string(), String::new());

        let response = handle(State(tracker()), Query(params)).await;

        let body = body_of(response).await;

        assert!(body.contains('\n'));
    }
}
