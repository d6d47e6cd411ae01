use std::sync::Arc;

use acp_hub::{Hub, InMemoryStorage};
use acp_hub_server::{router::create_router, state::AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_state() -> AppState {
    let storage = Arc::new(InMemoryStorage::new());
    let hub = Arc::new(Hub::new(storage, "test-pepper", false));
    AppState::new(hub)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = create_router(test_state());
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn authorize_without_bearer_token_is_rejected() {
    let app = create_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/authorize")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "tenant_id": "tenant_1",
                        "actor_type": "agent",
                        "action": "domain.publishers.create",
                        "request_hash": "abc",
                        "is_mutation": true
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

/// A heartbeat registers the kernel under its presented key; the same key
/// then authenticates an `/authorize` call end to end over HTTP.
#[tokio::test]
async fn heartbeat_then_authorize_round_trips_over_http() {
    let app = create_router(test_state());

    let heartbeat = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/heartbeat")
                .header("content-type", "application/json")
                .header("authorization", "Bearer kernel-key-1")
                .body(Body::from(
                    json!({
                        "kernelId": "kernel_http_test",
                        "version": "1.0.0",
                        "packs": ["meta", "iam", "domain"],
                        "env": "test"
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(heartbeat.status(), StatusCode::OK);
    let heartbeat_body = body_json(heartbeat).await;
    assert_eq!(heartbeat_body["kernel_registered"], true);

    let authorize = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/authorize")
                .header("content-type", "application/json")
                .header("authorization", "Bearer kernel-key-1")
                .body(Body::from(
                    json!({
                        "tenant_id": "kernel_http_test",
                        "actor_type": "agent",
                        "action": "domain.publishers.list",
                        "request_hash": "abc",
                        "params_summary": {},
                        "is_mutation": false
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(authorize.status(), StatusCode::OK);
    let authorize_body = body_json(authorize).await;
    assert_eq!(authorize_body["decision"], "allow");
    assert!(!authorize_body["decision_id"].as_str().unwrap().is_empty());
}
