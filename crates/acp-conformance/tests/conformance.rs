//! Cross-service invariants that no single crate's own test suite can
//! exercise on its own: a kernel `Router` wired to a real `Hub` and a real
//! KVE `Executor` in-process, plus universal properties that only make
//! sense at the hub level.

use std::sync::Arc;

use acp_conformance::{InProcessControlPlane, InProcessExecutor};
use acp_hub::{Hub, InMemoryStorage, PolicyStorage};
use acp_kernel::adapters::memory::{InMemoryAudit, InMemoryCeilings, InMemoryDb, InMemoryIdempotency, InMemoryRateLimit};
use acp_kernel::adapters::DbAdapter;
use acp_kernel::{Adapters, ActionRegistryBuilder, FailMode, KernelRuntimeBindings, ManageRequest, ManageResponse, Router};
use acp_kernel::packs;
use acp_kve::adapters::memory::{InMemoryAllowlist, InMemorySecretStore, InMemoryServiceKeys, InMemoryTenantIntegrations};
use acp_kve::Executor as KveExecutorImpl;
use acp_types::{
    ApiKeyRecord, ApiKeyStatus, Policy, PolicyCondition, PolicyEffect, PolicyId, RevokedSubject,
    ServiceKeyRecord, TenantIntegration,
};
use chrono::Utc;
use sha2::{Digest, Sha256};

const TENANT: &str = "tenant_conformance";
const ORG: &str = "org_conformance";

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

fn test_bindings() -> KernelRuntimeBindings {
    KernelRuntimeBindings {
        bindings: acp_types::KernelBindings {
            kernel_id: "kernel_conformance".to_string(),
            tenant_id: TENANT.to_string(),
            hub_base_url: "http://localhost".to_string(),
            hub_service_key: "svc".to_string(),
            kve_base_url: None,
            kve_service_key: None,
            installed_packs: vec!["meta".into(), "iam".into(), "domain".into()],
        },
        integration: "acp-conformance".to_string(),
        enabled: true,
        fail_mode: FailMode::Closed,
        ..KernelRuntimeBindings::default()
    }
}

async fn seed_key(db: &InMemoryDb, scopes: Vec<String>) -> String {
    let full_key = "conformance_key_0001";
    let prefix: String = full_key.chars().take(8).collect();
    let mut hasher = Sha256::new();
    hasher.update(full_key.as_bytes());
    let hash = hasher.finalize().iter().map(|b| format!("{b:02x}")).collect::<String>();

    db.insert_api_key(ApiKeyRecord {
        id: "key_conformance".to_string(),
        tenant_id: TENANT.to_string(),
        prefix,
        key_hash: hash,
        name: "conformance key".to_string(),
        scopes,
        status: ApiKeyStatus::Active,
        created_at: Utc::now(),
        revoked_at: None,
    })
    .await
    .unwrap();

    full_key.to_string()
}

fn make_kve_executor() -> Arc<KveExecutorImpl<InMemoryServiceKeys, InMemoryAllowlist, InMemoryTenantIntegrations, InMemorySecretStore>> {
    let service_keys = Arc::new(InMemoryServiceKeys::new());
    let allowlist = Arc::new(InMemoryAllowlist::new());
    let tenant_integrations = Arc::new(InMemoryTenantIntegrations::new());
    let secrets = Arc::new(InMemorySecretStore::new());

    allowlist.allow("echo", "ping");
    tenant_integrations.insert(TenantIntegration {
        tenant_id: TENANT.to_string(),
        integration: "echo".to_string(),
        credential_ref: "cred_echo".to_string(),
        enabled: true,
        metadata: serde_json::json!({}),
    });
    secrets.put("cred_echo", "unused-by-echo-handler");

    let pepper = "kve-conformance-pepper";
    let presented_key = "kve_service_key_0001";
    let key_hash = acp_types::hash_api_key(pepper, presented_key);
    service_keys.insert(ServiceKeyRecord {
        key_id: "svc_echo".to_string(),
        name: "echo conformance key".to_string(),
        organisation_id: Some(ORG.to_string()),
        allowed_tenant_ids: vec![TENANT.to_string()],
        key_hash,
        created_at: Utc::now(),
        expires_at: None,
        revoked_at: None,
        last_used_at: None,
    });

    let mut executor = KveExecutorImpl::new(service_keys, allowlist, tenant_integrations, secrets, pepper);
    executor.register_handler(Arc::new(acp_kve::adapters::memory::EchoHandler::new("echo")));
    Arc::new(executor)
}

/// A kernel mutation denied by a real hub policy is rejected end to end,
/// never reaching the executor.
#[tokio::test]
async fn hub_deny_policy_blocks_kernel_mutation() {
    let hub_storage = Arc::new(InMemoryStorage::new());
    hub_storage
        .upsert_policy(Policy {
            id: PolicyId("pol_deny_publishers".to_string()),
            organisation_id: ORG.to_string(),
            kernel_id: None,
            tenant_id: Some(TENANT.to_string()),
            name: "deny publisher writes".to_string(),
            priority: 0,
            enabled: true,
            conditions: vec![PolicyCondition::ActionMatches {
                pattern: "domain.publishers.create".to_string(),
            }],
            effect: PolicyEffect::Deny,
            reason: None,
            version: "v1".to_string(),
        })
        .await
        .unwrap();
    let hub = Arc::new(Hub::new(hub_storage, "hub-conformance-pepper", false));

    let control_plane = Arc::new(InProcessControlPlane::new(hub, ORG));

    let db = Arc::new(InMemoryDb::new());
    let audit = Arc::new(InMemoryAudit::new());
    let adapters = Adapters {
        db: db.clone(),
        audit: audit.clone(),
        idempotency: Arc::new(InMemoryIdempotency::new()),
        rate_limit: Arc::new(InMemoryRateLimit::new()),
        ceilings: Arc::new(InMemoryCeilings::new()),
        control_plane: Some(control_plane),
        executor: make_kve_executor_adapter(),
    };
    let router = Router::new(test_registry(), adapters, test_bindings()).unwrap();
    let key = seed_key(&db, vec!["manage.write".to_string()]).await;

    let response = router
        .handle(
            Some(&key),
            None,
            ManageRequest {
                action: "domain.publishers.create".to_string(),
                params: Some(serde_json::json!({"name": "acme"})),
                idempotency_key: None,
                dry_run: false,
            },
        )
        .await;

    match response {
        ManageResponse::Err { code, .. } => assert_eq!(code, "POLICY_DENIED"),
        other => panic!("expected a real hub policy denial, got {other:?}"),
    }
}

fn make_kve_executor_adapter() -> Arc<dyn acp_kernel::adapters::ExecutorAdapter> {
    Arc::new(InProcessExecutor::new(make_kve_executor(), "kve_service_key_0001"))
}

/// A kernel mutation allowed by a real hub policy reaches a real KVE
/// executor and its handler runs.
#[tokio::test]
async fn hub_allow_policy_reaches_real_executor() {
    let hub_storage = Arc::new(InMemoryStorage::new());
    hub_storage
        .upsert_policy(Policy {
            id: PolicyId("pol_allow_all".to_string()),
            organisation_id: ORG.to_string(),
            kernel_id: None,
            tenant_id: Some(TENANT.to_string()),
            name: "allow everything".to_string(),
            priority: 0,
            enabled: true,
            conditions: vec![PolicyCondition::Always],
            effect: PolicyEffect::Allow,
            reason: None,
            version: "v1".to_string(),
        })
        .await
        .unwrap();
    let hub = Arc::new(Hub::new(hub_storage, "hub-conformance-pepper", false));

    let control_plane = Arc::new(InProcessControlPlane::new(hub, ORG));

    let db = Arc::new(InMemoryDb::new());
    let audit = Arc::new(InMemoryAudit::new());
    let adapters = Adapters {
        db: db.clone(),
        audit: audit.clone(),
        idempotency: Arc::new(InMemoryIdempotency::new()),
        rate_limit: Arc::new(InMemoryRateLimit::new()),
        ceilings: Arc::new(InMemoryCeilings::new()),
        control_plane: Some(control_plane),
        executor: make_kve_executor_adapter(),
    };
    let router = Router::new(test_registry(), adapters, test_bindings()).unwrap();
    let key = seed_key(&db, vec!["manage.write".to_string()]).await;

    let response = router
        .handle(
            Some(&key),
            None,
            ManageRequest {
                action: "domain.publishers.create".to_string(),
                params: Some(serde_json::json!({"name": "acme"})),
                idempotency_key: None,
                dry_run: false,
            },
        )
        .await;

    match response {
        ManageResponse::Ok { .. } => {}
        other => panic!("expected a real hub allow to reach the executor, got {other:?}"),
    }
}

/// The request hash is stable under sensitive-field redaction but still
/// reacts to any other change to the params.
#[test]
fn sanitised_hash_stability() {
    let base = serde_json::json!({"name": "acme", "api_key": "sk-one"});
    let changed_secret = serde_json::json!({"name": "acme", "api_key": "sk-two"});
    let changed_name = serde_json::json!({"name": "widgets", "api_key": "sk-one"});

    let h1 = acp_types::canonical::request_hash(TENANT, "domain.publishers.create", &base);
    let h2 = acp_types::canonical::request_hash(TENANT, "domain.publishers.create", &changed_secret);
    let h3 = acp_types::canonical::request_hash(TENANT, "domain.publishers.create", &changed_name);

    assert_eq!(h1, h2, "changing only a sensitive field must not change the hash");
    assert_ne!(h1, h3, "changing a non-sensitive field must change the hash");
}

/// Universal invariant: a decision the hub reports as `Allow` always carries
/// a persisted, freshly minted decision id.
#[tokio::test]
async fn hub_allow_always_carries_a_decision_id() {
    let hub_storage = Arc::new(InMemoryStorage::new());
    hub_storage
        .upsert_policy(Policy {
            id: PolicyId("pol_allow_all".to_string()),
            organisation_id: ORG.to_string(),
            kernel_id: None,
            tenant_id: Some(TENANT.to_string()),
            name: "allow everything".to_string(),
            priority: 0,
            enabled: true,
            conditions: vec![PolicyCondition::Always],
            effect: PolicyEffect::Allow,
            reason: None,
            version: "v1".to_string(),
        })
        .await
        .unwrap();
    let hub = Hub::new(hub_storage, "hub-conformance-pepper", false);

    let result = hub
        .decisions
        .authorize(acp_hub::AuthorizeRequest {
            organisation_id: ORG.to_string(),
            kernel_id: "kernel_conformance".to_string(),
            tenant_id: TENANT.to_string(),
            actor_type: "agent".to_string(),
            action: "domain.publishers.create".to_string(),
            request_hash: "hash".to_string(),
            params_summary: serde_json::json!({"name": "acme"}),
            is_mutation: true,
        })
        .await
        .unwrap();

    match result.decision {
        acp_types::Decision::Allow { decision_id, .. } => {
            assert!(!decision_id.to_string().is_empty());
        }
        other => panic!("expected allow, got {other:?}"),
    }
}

/// Universal invariant: once an id is revoked at snapshot version v, it
/// remains revoked in every later snapshot until explicitly un-revoked (this
/// system has no un-revoke operation, so it simply never disappears).
#[tokio::test]
async fn revocation_remains_present_across_later_snapshots() {
    let hub_storage = Arc::new(InMemoryStorage::new());
    let hub = Hub::new(hub_storage, "hub-conformance-pepper", false);

    let subject = RevokedSubject::ApiKey {
        key_id: "key_to_revoke".to_string(),
    };
    let v1 = hub.revocations.revoke(ORG, subject.clone(), Some("compromised".to_string())).await.unwrap();
    let snapshot_v1 = hub.revocations.snapshot(ORG).await.unwrap();
    assert_eq!(snapshot_v1.version, v1);
    assert!(snapshot_v1.is_revoked(&subject));

    let _v2 = hub
        .revocations
        .revoke(
            ORG,
            RevokedSubject::ApiKey {
                key_id: "another_key".to_string(),
            },
            None,
        )
        .await
        .unwrap();
    let snapshot_v2 = hub.revocations.snapshot(ORG).await.unwrap();
    assert!(snapshot_v2.version > snapshot_v1.version);
    assert!(snapshot_v2.is_revoked(&subject), "earlier revocation must survive later snapshots");
}
