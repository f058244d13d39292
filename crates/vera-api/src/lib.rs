#![warn(missing_docs)]
//! # vera-api: HTTP Host
//!
//! Serves one composed agent over Axum/Tower/Tokio. Handlers only translate
//! HTTP to agent calls; all behaviour lives in the library crates.
//!
//! ## Routes
//!
//! - `POST /didcomm`: raw message intake, `202 Accepted`
//! - `GET /.well-known/did.json`: the host's `did:web` document
//! - `GET /sdr/:tag`: signed selective disclosure request for a session
//! - `GET /sessions/:tag`: latest login event for a session
//! - `GET /messages`: validated messages, filtered by query string
//! - `GET /agent`, `POST /agent/:method`: the agent method surface
//! - `GET /health/liveness`: process liveness check
//!
//! All errors map to structured JSON responses via [`AppError`].

pub mod error;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use error::AppError;
pub use state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::didcomm::router())
        .merge(routes::identity::router())
        .merge(routes::messages::router())
        .merge(routes::sessions::router())
        .merge(routes::agent::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let health = Router::new().route("/health/liveness", axum::routing::get(liveness));

    Router::new().merge(health).merge(api)
}

/// Liveness check. Always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;
    use vera_agent::{compose, AgentConfig};
    use vera_did::CreateIdentifierOptions;
    use vera_msg::SessionEvent;
    use vera_vc::{PresentationPayload, ED25519_SIGNATURE_2020};

    async fn test_state() -> AppState {
        let config = AgentConfig {
            hostname: "agent.example".into(),
            ..AgentConfig::default()
        };
        AppState::new(compose(&config, Vec::new()).await.unwrap())
    }

    async fn send(state: &AppState, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app(state.clone()).oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.into())
            .unwrap()
    }

    #[tokio::test]
    async fn liveness_responds_ok() {
        let resp = app(test_state().await)
            .oneshot(get("/health/liveness"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn publishes_web_did_document() {
        let state = test_state().await;
        let (status, doc) = send(&state, get("/.well-known/did.json")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["id"], "did:web:agent.example");
        assert_eq!(doc["verificationMethod"].as_array().unwrap().len(), 2);
        let agreement = doc["keyAgreement"].as_array().unwrap();
        assert_eq!(agreement.len(), 1);
        assert_eq!(
            doc["verificationMethod"][1]["type"],
            "X25519KeyAgreementKey2020"
        );
        assert_eq!(agreement[0], doc["verificationMethod"][1]["id"]);

        // The same identity is served on every request.
        let (_, again) = send(&state, get("/.well-known/did.json")).await;
        assert_eq!(again, doc);
    }

    #[tokio::test]
    async fn session_login_round_trip() {
        let state = test_state().await;

        let (status, sdr) = send(&state, get("/sdr/abc123")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sdr["tag"], "abc123");
        assert_eq!(sdr["sdr"].as_str().unwrap().split('.').count(), 3);

        let (status, _) = send(&state, get("/sessions/abc123")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let holder = state
            .services
            .identifiers
            .create("did:key", &CreateIdentifierOptions::default())
            .await
            .unwrap()
            .did;
        let vp = state
            .services
            .issuer
            .create_verifiable_presentation(
                PresentationPayload::new(holder.clone(), vec![]),
                Some("abc123"),
                ED25519_SIGNATURE_2020,
            )
            .await
            .unwrap();
        let mut events = state.services.sessions.subscribe("abc123");

        let raw = json!({"tag": "abc123", "body": vp}).to_string();
        let (status, accepted) = send(&state, post("/didcomm", raw)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(accepted["hash"].as_str().unwrap().len(), 64);

        let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event, SessionEvent::LoggedIn { did: holder.clone() });

        let (status, latest) = send(&state, get("/sessions/abc123")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest, json!({"event": "loggedIn", "did": holder.to_string()}));

        let (status, listed) = send(&state, get("/messages?tag=abc123&type=w3c.vp")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["hash"], accepted["hash"]);
    }

    #[tokio::test]
    async fn empty_intake_is_a_bad_request() {
        let state = test_state().await;
        let (status, body) = send(&state, post("/didcomm", "  ")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn malformed_message_filter_is_a_bad_request() {
        let state = test_state().await;
        let (status, _) = send(&state, get("/messages?hash=nothex")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn agent_methods_are_reachable() {
        let state = test_state().await;
        let (status, methods) = send(&state, get("/agent")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(methods
            .as_array()
            .unwrap()
            .contains(&json!("createVerifiableCredential")));

        let (status, providers) =
            send(&state, post("/agent/didManagerGetProviders", "{}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(providers, json!(["did:key", "did:web"]));

        let (status, body) = send(&state, post("/agent/noSuchMethod", "{}")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, _) =
            send(&state, post("/agent/keyManagerCreate", r#"{"kind":"RSA"}"#)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
