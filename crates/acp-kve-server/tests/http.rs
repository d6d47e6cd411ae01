use std::sync::Arc;

use acp_kve::adapters::memory::{EchoHandler, InMemoryAllowlist, InMemorySecretStore, InMemoryServiceKeys, InMemoryTenantIntegrations};
use acp_kve::Executor;
use acp_kve_server::{router::create_router, state::AppState};
use acp_types::{ServiceKeyRecord, TenantIntegration};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

const PEPPER: &str = "test-pepper";
const RAW_SERVICE_KEY: &str = "svc_http_test_key";

fn test_state() -> AppState {
    let service_keys = Arc::new(InMemoryServiceKeys::new());
    let allowlist = Arc::new(InMemoryAllowlist::new());
    let tenant_integrations = Arc::new(InMemoryTenantIntegrations::new());
    let secrets = Arc::new(InMemorySecretStore::new());

    allowlist.allow("echo", "ping");
    tenant_integrations.insert(TenantIntegration {
        tenant_id: "tenant_1".to_string(),
        integration: "echo".to_string(),
        credential_ref: "cred_echo".to_string(),
        enabled: true,
        metadata: serde_json::json!({}),
    });
    secrets.put("cred_echo", "unused-by-echo-handler");
    service_keys.insert(ServiceKeyRecord {
        key_id: "svc_1".to_string(),
        name: "echo service key".to_string(),
        organisation_id: Some("org_1".to_string()),
        allowed_tenant_ids: vec!["tenant_1".to_string()],
        key_hash: acp_types::hash_api_key(PEPPER, RAW_SERVICE_KEY),
        created_at: Utc::now(),
        expires_at: None,
        revoked_at: None,
        last_used_at: None,
    });

    let mut executor = Executor::new(service_keys, allowlist, tenant_integrations, secrets, PEPPER);
    executor.register_handler(Arc::new(EchoHandler::new("echo")));

    AppState::new(Arc::new(executor))
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
async fn execute_without_bearer_token_is_rejected() {
    let app = create_router(test_state());
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/execute")
                .header("content-type", "application/json")
                .body(Body::from(json!({}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn execute_with_valid_service_key_reaches_the_echo_handler() {
    let app = create_router(test_state());
    let request_hash = acp_types::canonical::request_hash("tenant_1", "echo.ping", &json!({}));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/execute")
                .header("content-type", "application/json")
                .header("authorization", format!("Bearer {RAW_SERVICE_KEY}"))
                .body(Body::from(
                    json!({
                        "tenant_id": "tenant_1",
                        "integration": "echo",
                        "action": "ping",
                        "params": {},
                        "request_hash": request_hash,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
    assert_eq!(body["data"]["action"], "ping");
}
