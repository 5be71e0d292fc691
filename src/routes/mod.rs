//! API route handlers.

pub mod extract;
pub mod health;
pub mod session;
pub mod verify;

use crate::error::AppError;
use crate::idena::IdenaSignIn;
use crate::providers::ProviderRegistry;
use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub signin: Arc<IdenaSignIn>,
    pub providers: Arc<ProviderRegistry>,
}

/// Validate an identity address: `0x` followed by 40 hex characters.
pub fn validate_address(address: &str) -> Result<(), AppError> {
    let valid = address
        .strip_prefix("0x")
        .is_some_and(|hex| hex.len() == 40 && hex.chars().all(|c| c.is_ascii_hexdigit()));
    if !valid {
        return Err(AppError::BadRequest("Invalid address format".to_string()));
    }
    Ok(())
}

/// Reject empty or oversized opaque values (tokens, signatures).
pub fn validate_opaque(value: &str, label: &str) -> Result<(), AppError> {
    if value.is_empty() || value.len() > 512 {
        return Err(AppError::BadRequest(format!("Invalid {} format", label)));
    }
    Ok(())
}

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        // Idena sign-in session endpoints
        .route("/session/init", post(session::init_session))
        .route("/session/start", post(session::start_session))
        .route("/session/authenticate", post(session::authenticate))
        .route("/session/identity", get(session::identity_state))
        .route("/session/age", get(session::identity_age))
        .route("/session/stake", get(session::identity_stake))
        // Provider checks
        .route("/verify", post(verify::verify))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::idena::HttpIdenaApi;
    use crate::storage::{ExpiryMode, MemorySessionStore};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    /// Router over an empty memory store. The Idena API is unreachable, so
    /// only requests rejected before any upstream call get a real answer.
    fn test_app() -> Router {
        let store = MemorySessionStore::new(
            Duration::from_secs(300),
            Arc::new(ManualClock::default()),
            ExpiryMode::Sweep,
        );
        let api = HttpIdenaApi::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        let state = AppState {
            signin: Arc::new(IdenaSignIn::new(Arc::new(store), Arc::new(api))),
            providers: Arc::new(ProviderRegistry::new()),
        };
        api_router().with_state(state)
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let (status, body) = send(post_json("/session/start", "{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid JSON payload"));
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let request = post_json("/session/authenticate", r#"{"token":"idena-00"}"#);
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("signature"));

        let (status, _) = send(post_json("/verify", r#"{"type":"Lens"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_content_type_is_bad_request() {
        let request = Request::post("/session/start")
            .body(Body::from(r#"{"token":"idena-00","address":"0x00"}"#))
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing Content-Type: application/json header");
    }

    #[tokio::test]
    async fn test_missing_token_query_is_bad_request() {
        for uri in ["/session/identity", "/session/age", "/session/stake"] {
            let request = Request::get(uri).body(Body::empty()).unwrap();
            let (status, body) = send(request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["error"].as_str().unwrap().starts_with("Invalid query string"));
        }
    }

    #[tokio::test]
    async fn test_unknown_session_query_is_not_found() {
        let request = Request::get("/session/identity?token=idena-missing")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "session not found or expired");
    }

    #[test]
    fn test_validate_address() {
        assert!(validate_address("0x1111111111111111111111111111111111111111").is_ok());
        assert!(validate_address("0xAbCdEf1111111111111111111111111111111111").is_ok());
        assert!(validate_address("1111111111111111111111111111111111111111").is_err());
        assert!(validate_address("0x111").is_err());
        assert!(validate_address("0xzz11111111111111111111111111111111111111").is_err());
        assert!(validate_address("").is_err());
    }

    #[test]
    fn test_validate_opaque() {
        assert!(validate_opaque("idena-ab", "token").is_ok());
        assert!(validate_opaque("", "token").is_err());
        assert!(validate_opaque(&"a".repeat(513), "signature").is_err());
    }
}
