use std::sync::Arc;

use acp_kernel::adapters::memory::{
    AlwaysAllowControlPlane, EchoExecutor, InMemoryAudit, InMemoryCeilings, InMemoryDb,
    InMemoryIdempotency, InMemoryRateLimit, UnreachableControlPlane,
};
use acp_kernel::adapters::DbAdapter;
use acp_kernel::{Adapters, ActionRegistryBuilder, FailMode, KernelRuntimeBindings, ManageRequest, ManageResponse, Router};
use acp_kernel::packs;
use acp_types::KernelBindings;

fn test_registry() -> Arc<acp_kernel::ActionRegistry> {
    let registry = ActionRegistryBuilder::new()
        .add_pack(packs::meta::build(
            Arc::new(|| vec![]),
            Arc::new(|| 0),
        ))
        .unwrap()
        .add_pack(packs::iam::build())
        .unwrap()
        .add_pack(packs::domain::build())
        .unwrap()
        .build();
    Arc::new(registry)
}

fn test_bindings(enabled: bool, fail_mode: FailMode) -> KernelRuntimeBindings {
    KernelRuntimeBindings {
        bindings: KernelBindings {
            kernel_id: "kernel_test".to_string(),
            tenant_id: "tenant_test".to_string(),
            hub_base_url: "http://localhost".to_string(),
            hub_service_key: "svc".to_string(),
            kve_base_url: None,
            kve_service_key: None,
            installed_packs: vec!["meta".into(), "iam".into(), "domain".into()],
        },
        integration: "acp-test".to_string(),
        enabled,
        fail_mode,
        ..KernelRuntimeBindings::default()
    }
}

async fn seed_key(db: &InMemoryDb, scopes: Vec<String>) -> String {
    use acp_types::{ApiKeyRecord, ApiKeyStatus};
    use chrono::Utc;
    use sha2::{Digest, Sha256};

    let full_key = "testkey_1234567890";
    let prefix: String = full_key.chars().take(8).collect();
    let mut hasher = Sha256::new();
    hasher.update(full_key.as_bytes());
    let hash = hasher.finalize().iter().map(|b| format!("{b:02x}")).collect::<String>();

    db.insert_api_key(ApiKeyRecord {
        id: "key_1".to_string(),
        tenant_id: "tenant_test".to_string(),
        prefix,
        key_hash: hash,
        name: "test key".to_string(),
        scopes,
        status: ApiKeyStatus::Active,
        created_at: Utc::now(),
        revoked_at: None,
    })
    .await
    .unwrap();

    full_key.to_string()
}

fn build_router(fail_mode: FailMode, control_plane: Arc<dyn acp_kernel::adapters::ControlPlaneAdapter>) -> (Router, Arc<InMemoryDb>, Arc<InMemoryAudit>) {
    let db = Arc::new(InMemoryDb::new());
    let audit = Arc::new(InMemoryAudit::new());
    let adapters = Adapters {
        db: db.clone(),
        audit: audit.clone(),
        idempotency: Arc::new(InMemoryIdempotency::new()),
        rate_limit: Arc::new(InMemoryRateLimit::new()),
        ceilings: Arc::new(InMemoryCeilings::new()),
        control_plane: Some(control_plane),
        executor: Arc::new(EchoExecutor),
    };
    let router = Router::new(test_registry(), adapters, test_bindings(true, fail_mode)).unwrap();
    (router, db, audit)
}

#[tokio::test]
async fn unknown_action_returns_not_found() {
    let (router, db, audit) = build_router(FailMode::Closed, Arc::new(AlwaysAllowControlPlane));
    let key = seed_key(&db, vec!["manage.read".to_string()]).await;

    let response = router
        .handle(
            Some(&key),
            None,
            ManageRequest {
                action: "unknown.action.xyz".to_string(),
                params: None,
                idempotency_key: None,
                dry_run: false,
            },
        )
        .await;

    match response {
        ManageResponse::Err { code, .. } => assert_eq!(code, "NOT_FOUND"),
        _ => panic!("expected an error response"),
    }
    assert_eq!(audit.len(), 1);
}

#[tokio::test]
async fn scope_denial_for_iam_create_without_scope() {
    let (router, db, audit) = build_router(FailMode::Closed, Arc::new(AlwaysAllowControlPlane));
    let key = seed_key(&db, vec!["manage.read".to_string()]).await;

    let response = router
        .handle(
            Some(&key),
            None,
            ManageRequest {
                action: "iam.keys.create".to_string(),
                params: Some(serde_json::json!({"scopes": ["manage.read"]})),
                idempotency_key: None,
                dry_run: false,
            },
        )
        .await;

    match response {
        ManageResponse::Err { code, error, .. } => {
            assert_eq!(code, "SCOPE_DENIED");
            assert!(error.contains("manage.iam"));
        }
        _ => panic!("expected scope denial"),
    }
    assert_eq!(audit.len(), 1);
}

#[tokio::test]
async fn dry_run_create_does_not_mutate() {
    let (router, db, audit) = build_router(FailMode::Closed, Arc::new(AlwaysAllowControlPlane));
    let key = seed_key(&db, vec!["manage.iam".to_string(), "manage.read".to_string()]).await;

    let response = router
        .handle(
            Some(&key),
            None,
            ManageRequest {
                action: "iam.keys.create".to_string(),
                params: Some(serde_json::json!({"scopes": ["manage.read"]})),
                idempotency_key: None,
                dry_run: true,
            },
        )
        .await;

    match response {
        ManageResponse::Ok { dry_run, .. } => assert!(dry_run),
        _ => panic!("expected a successful dry-run response"),
    }

    let keys_after = db.list_api_keys("tenant_test").await.unwrap();
    assert!(keys_after.is_empty());
    assert_eq!(audit.len(), 1);
}

#[tokio::test]
async fn idempotent_replay_runs_handler_once() {
    let (router, db, _audit) = build_router(FailMode::Closed, Arc::new(AlwaysAllowControlPlane));
    let key = seed_key(&db, vec!["manage.write".to_string(), "manage.read".to_string()]).await;

    let req = || ManageRequest {
        action: "domain.leadscoring.models.create".to_string(),
        params: Some(serde_json::json!({"name": "model-a"})),
        idempotency_key: Some("k-42".to_string()),
        dry_run: false,
    };

    let first = router.handle(Some(&key), None, req()).await;
    let second = router.handle(Some(&key), None, req()).await;

    let first_data = match first {
        ManageResponse::Ok { data, code, .. } => {
            assert!(code.is_none());
            data
        }
        _ => panic!("expected first call to succeed"),
    };
    match second {
        ManageResponse::Ok { data, code, .. } => {
            assert_eq!(code, Some("IDEMPOTENT_REPLAY"));
            assert_eq!(data, first_data);
        }
        _ => panic!("expected replay on second call"),
    }
}

#[tokio::test]
async fn degraded_read_open_allows_reads_denies_writes() {
    let (router, db, _audit) = build_router(FailMode::ReadOpen, Arc::new(UnreachableControlPlane));
    let key = seed_key(&db, vec!["manage.read".to_string(), "manage.write".to_string()]).await;

    let read_response = router
        .handle(
            Some(&key),
            None,
            ManageRequest {
                action: "domain.publishers.list".to_string(),
                params: None,
                idempotency_key: None,
                dry_run: false,
            },
        )
        .await;
    assert!(matches!(read_response, ManageResponse::Ok { .. }));

    let write_response = router
        .handle(
            Some(&key),
            None,
            ManageRequest {
                action: "domain.publishers.delete".to_string(),
                params: Some(serde_json::json!({"id": "p1"})),
                idempotency_key: None,
                dry_run: false,
            },
        )
        .await;
    match write_response {
        ManageResponse::Err { code, .. } => assert_eq!(code, "GOVERNANCE_UNAVAILABLE"),
        _ => panic!("expected writes to be denied under outage"),
    }
}
