use std::sync::Arc;

use acp_kernel::adapters::memory::{
    AlwaysAllowControlPlane, EchoExecutor, InMemoryAudit, InMemoryCeilings, InMemoryDb, InMemoryIdempotency, InMemoryRateLimit,
};
use acp_kernel::adapters::DbAdapter;
use acp_kernel::{Adapters, ActionRegistryBuilder, FailMode, KernelRuntimeBindings, Router};
use acp_kernel::packs;
use acp_kernel_server::{router::create_router, state::AppState};
use acp_types::{ApiKeyRecord, ApiKeyStatus, KernelBindings};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::Utc;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tower::ServiceExt;

const RAW_API_KEY: &str = "http_test_api_key_0001";

fn test_registry() -> Arc<acp_kernel::ActionRegistry> {
    let registry = ActionRegistryBuilder::new()
        .add_pack(packs::meta::build(Arc::new(|| vec![]), Arc::new(|| 0)))
        .unwrap()
        .add_pack(packs::iam::build())
        .unwrap()
        .add_pack(packs::domain::build())
        .unwrap()
        .build();
    Arc::new(registry)
}

async fn test_app() -> (axum::Router, String) {
    let db = Arc::new(InMemoryDb::new());
    let audit = Arc::new(InMemoryAudit::new());
    let adapters = Adapters {
        db: db.clone(),
        audit,
        idempotency: Arc::new(InMemoryIdempotency::new()),
        rate_limit: Arc::new(InMemoryRateLimit::new()),
        ceilings: Arc::new(InMemoryCeilings::new()),
        control_plane: Some(Arc::new(AlwaysAllowControlPlane)),
        executor: Arc::new(EchoExecutor),
    };
    let bindings = KernelRuntimeBindings {
        bindings: KernelBindings {
            kernel_id: "kernel_http_test".to_string(),
            tenant_id: "tenant_http_test".to_string(),
            hub_base_url: "http://localhost".to_string(),
            hub_service_key: "svc".to_string(),
            kve_base_url: None,
            kve_service_key: None,
            installed_packs: vec!["meta".into(), "iam".into(), "domain".into()],
        },
        integration: "acp-http-test".to_string(),
        enabled: true,
        fail_mode: FailMode::Closed,
        ..KernelRuntimeBindings::default()
    };
    let manage_path = format!("{}{}", bindings.base_path, bindings.endpoint_path);

    let prefix: String = RAW_API_KEY.chars().take(8).collect();
    let mut hasher = Sha256::new();
    hasher.update(RAW_API_KEY.as_bytes());
    let hash = hasher.finalize().iter().map(|b| format!("{b:02x}")).collect::<String>();
    db.insert_api_key(ApiKeyRecord {
        id: "key_http_test".to_string(),
        tenant_id: "tenant_http_test".to_string(),
        prefix,
        key_hash: hash,
        name: "http test key".to_string(),
        scopes: vec!["manage.read".to_string(), "manage.write".to_string()],
        status: ApiKeyStatus::Active,
        created_at: Utc::now(),
        revoked_at: None,
    })
    .await
    .unwrap();

    let router = Arc::new(Router::new(test_registry(), adapters, bindings).unwrap());
    let state = AppState::new(router);
    (create_router(state, &manage_path), manage_path)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _) = test_app().await;
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn manage_without_api_key_is_rejected() {
    let (app, manage_path) = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(&manage_path)
                .header("content-type", "application/json")
                .body(Body::from(json!({"action": "domain.publishers.list"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn manage_with_valid_api_key_reaches_the_handler() {
    let (app, manage_path) = test_app().await;
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(&manage_path)
                .header("content-type", "application/json")
                .header("x-api-key", RAW_API_KEY)
                .body(Body::from(json!({"action": "domain.publishers.list"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], true);
}
