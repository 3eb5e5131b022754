//! Admin handlers for the user registry.
use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::core::auth::{Passkey, User};
use crate::core::Tracker;
use crate::servers::apis::v1::responses::{error_response, invalid_param_response, json_body_response, ok_response};

pub async fn get_user(State(tracker): State<Arc<Tracker>>, Path(passkey): Path<String>) -> Response {
    let Ok(passkey) = Passkey::from_str(&passkey) else {
        return invalid_param_response("passkey is invalid");
    };

    match tracker.find_user(Some(&passkey)).await {
        Ok(user) => match serde_json::to_string(&user) {
            Ok(body) => json_body_response(body),
            Err(_) => error_response(&crate::core::error::Error::Internal),
        },
        Err(error) => error_response(&error),
    }
}

/// It registers a user. The passkey in the path is ignored: a fresh one is
/// always generated, and the response carries the stored record including
/// it.
pub async fn put_user(State(tracker): State<Arc<Tracker>>, Path(_passkey): Path<String>, Json(user): Json<User>) -> Response {
    match tracker.register_user(user).await {
        Ok(user) => match serde_json::to_string(&user) {
            Ok(body) => json_body_response(body),
            Err(_) => error_response(&crate::core::error::Error::Internal),
        },
        Err(error) => error_response(&error),
    }
}

pub async fn delete_user(State(tracker): State<Arc<Tracker>>, Path(passkey): Path<String>) -> Response {
    let Ok(passkey) = Passkey::from_str(&passkey) else {
        return invalid_param_response("passkey is invalid");
    };

    match tracker.delete_user(&passkey).await {
        Ok(()) => ok_response(),
        Err(error) => error_response(&error),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, State};
    use axum::http::StatusCode;
    use axum::Json;

    use super::{delete_user, get_user, put_user};
    use crate::config::Configuration;
    use crate::core::auth::User;
    use crate::core::{statistics, Tracker};

    fn tracker() -> Arc<Tracker> {
        Arc::new(Tracker::new(&Configuration::default(), None, statistics::Repo::new()).unwrap())
    }

    fn sample_user() -> User {
        User {
            id: 0,
            passkey: None,
            username: "alice".to_string(),
            cred: String::new(),
            up_multiplier: 1.0,
            down_multiplier: 1.0,
        }
    }

    async fn registered_passkey(tracker: &Arc<Tracker>) -> String {
        let response = put_user(State(tracker.clone()), Path("new".to_string()), Json(sample_user())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let user: User = serde_json::from_slice(&bytes).unwrap();
        user.passkey.unwrap().to_string()
    }

    #[tokio::test]
    async fn it_should_register_a_user_and_return_its_passkey() {
        let tracker = tracker();

        let passkey = registered_passkey(&tracker).await;

        assert_eq!(passkey.len(), 48);
    }

    #[tokio::test]
    async fn it_should_fetch_and_delete_a_registered_user() {
        let tracker = tracker();
        let passkey = registered_passkey(&tracker).await;

        let response = get_user(State(tracker.clone()), Path(passkey.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = delete_user(State(tracker.clone()), Path(passkey.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get_user(State(tracker), Path(passkey)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn it_should_reject_a_malformed_passkey() {
        let response = get_user(State(tracker()), Path("short".to_string())).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
