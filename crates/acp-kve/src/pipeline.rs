//! The executor's request pipeline.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use acp_types::{hash_api_key, redact_error_message, ExecuteRequest, ExecuteResponse, ExecuteStatus, UpstreamMeta};

use crate::adapters::{AllowlistStore, IntegrationHandler, SecretStore, ServiceKeyStore, TenantIntegrationStore};
use crate::error::{KveError, Result};

const MAX_BODY_BYTES: usize = 64 * 1024;

pub struct Executor<K, A, T, S> {
    service_keys: Arc<K>,
    allowlist: Arc<A>,
    tenant_integrations: Arc<T>,
    secrets: Arc<S>,
    pepper: String,
    handlers: HashMap<String, Arc<dyn IntegrationHandler>>,
}

impl<K, A, T, S> Executor<K, A, T, S>
where
    K: ServiceKeyStore,
    A: AllowlistStore,
    T: TenantIntegrationStore,
    S: SecretStore,
{
    pub fn new(
        service_keys: Arc<K>,
        allowlist: Arc<A>,
        tenant_integrations: Arc<T>,
        secrets: Arc<S>,
        pepper: impl Into<String>,
    ) -> Self {
        Self {
            service_keys,
            allowlist,
            tenant_integrations,
            secrets,
            pepper: pepper.into(),
            handlers: HashMap::new(),
        }
    }

    pub fn register_handler(&mut self, handler: Arc<dyn IntegrationHandler>) {
        self.handlers.insert(handler.integration().to_string(), handler);
    }

    /// Runs the full pipeline for a presented service key and raw body size
    /// check: authenticate, allowlist, load credentials, dispatch, redact.
    pub async fn execute(
        &self,
        presented_service_key: &str,
        raw_body_len: usize,
        req: ExecuteRequest,
    ) -> Result<ExecuteResponse> {
        if raw_body_len > MAX_BODY_BYTES {
            return Err(KveError::PayloadTooLarge);
        }

        let start = Instant::now();
        let now = chrono::Utc::now();
        let key_hash = hash_api_key(&self.pepper, presented_service_key);
        let service_key = self
            .service_keys
            .find_by_key_hash(&key_hash)
            .await?
            .filter(|k| !k.is_revoked() && !k.is_expired(now))
            .ok_or(KveError::Unauthenticated)?;

        if !self.allowlist.is_allowed(&req.integration, &req.action.0).await? {
            return Err(KveError::NotAllowlisted(req.integration.clone(), req.action.0.clone()));
        }

        if !service_key.allowed_tenant_ids.iter().any(|t| t == &req.tenant_id) {
            return Err(KveError::TenantNotAuthorized);
        }

        let integration_config = self
            .tenant_integrations
            .find(&req.tenant_id, &req.integration)
            .await?
            .filter(|i| i.enabled)
            .ok_or(KveError::CredentialNotFound)?;

        let token = self
            .secrets
            .read_secret(&integration_config.credential_ref)
            .await?
            .ok_or(KveError::CredentialNotFound)?;

        let handler = self
            .handlers
            .get(&req.integration)
            .ok_or_else(|| KveError::HandlerFailed(format!("no handler registered for '{}'", req.integration)))?;

        tracing::info!(
            tenant_id = %req.tenant_id,
            integration = %req.integration,
            action = %req.action,
            request_hash = %req.request_hash,
            service_key_id = %service_key.key_id,
            "executing",
        );

        let outcome = handler
            .execute(&req.action.0, &req.params, &token, &req.tenant_id, &integration_config.metadata)
            .await;

        let duration_ms = start.elapsed().as_millis() as u64;

        let response = match outcome {
            Ok(result) => {
                tracing::info!(
                    tenant_id = %req.tenant_id,
                    integration = %req.integration,
                    action = %req.action,
                    request_hash = %req.request_hash,
                    service_key_id = %service_key.key_id,
                    duration_ms,
                    outcome = "success",
                    "executed",
                );
                ExecuteResponse {
                    ok: true,
                    status: ExecuteStatus::Success,
                    result_meta: result.result_meta,
                    data: Some(result.data),
                    error_code: None,
                    error_message_redacted: None,
                    upstream: UpstreamMeta {
                        http_status: result.upstream_http_status,
                        request_id: result.upstream_request_id,
                    },
                }
            }
            Err(err) => {
                tracing::warn!(
                    tenant_id = %req.tenant_id,
                    integration = %req.integration,
                    action = %req.action,
                    request_hash = %req.request_hash,
                    service_key_id = %service_key.key_id,
                    duration_ms,
                    outcome = "error",
                    "execute failed",
                );
                ExecuteResponse {
                    ok: false,
                    status: ExecuteStatus::Error,
                    result_meta: None,
                    data: None,
                    error_code: Some("INTERNAL_ERROR".to_string()),
                    error_message_redacted: Some(redact_error_message(&err.to_string())),
                    upstream: UpstreamMeta {
                        http_status: 502,
                        request_id: None,
                    },
                }
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{
        EchoHandler, FailingHandler, InMemoryAllowlist, InMemoryServiceKeys, InMemorySecretStore,
        InMemoryTenantIntegrations,
    };
    use acp_types::{ActionName, ServiceKeyRecord, TenantIntegration};
    use chrono::Utc;

    fn make_executor() -> (Executor<InMemoryServiceKeys, InMemoryAllowlist, InMemoryTenantIntegrations, InMemorySecretStore>, String) {
        let service_keys = Arc::new(InMemoryServiceKeys::new());
        let allowlist = Arc::new(InMemoryAllowlist::new());
        let tenant_integrations = Arc::new(InMemoryTenantIntegrations::new());
        let secrets = Arc::new(InMemorySecretStore::new());

        let raw_key = "sk_live_service_key";
        let pepper = "test-pepper";
        let key_hash = hash_api_key(pepper, raw_key);
        service_keys.insert(ServiceKeyRecord {
            key_id: "svc1".to_string(),
            name: "shopify service key".to_string(),
            organisation_id: Some("org1".to_string()),
            allowed_tenant_ids: vec!["tenant1".to_string()],
            key_hash,
            created_at: Utc::now(),
            expires_at: None,
            revoked_at: None,
            last_used_at: None,
        });
        allowlist.allow("shopify", "orders.refund");
        tenant_integrations.insert(TenantIntegration {
            tenant_id: "tenant1".to_string(),
            integration: "shopify".to_string(),
            credential_ref: "cred-1".to_string(),
            enabled: true,
            metadata: serde_json::json!({}),
        });
        secrets.put("cred-1", "shpat_secret_token");

        let mut executor = Executor::new(service_keys, allowlist, tenant_integrations, secrets, pepper);
        executor.register_handler(Arc::new(EchoHandler::new("shopify")));
        (executor, raw_key.to_string())
    }

    fn req(action: &str) -> ExecuteRequest {
        ExecuteRequest {
            request_id: Default::default(),
            tenant_id: "tenant1".to_string(),
            integration: "shopify".to_string(),
            action: ActionName::new(action),
            params: serde_json::json!({"order_id": "o1"}),
            request_hash: "hash".to_string(),
            trace: None,
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn successful_execute_returns_sanitized_data() {
        let (executor, key) = make_executor();
        let response = executor.execute(&key, 100, req("orders.refund")).await.unwrap();
        assert!(response.ok);
        assert_eq!(response.status, ExecuteStatus::Success);
    }

    #[tokio::test]
    async fn wrong_service_key_is_unauthenticated() {
        let (executor, _key) = make_executor();
        let result = executor.execute("wrong-key", 100, req("orders.refund")).await;
        assert!(matches!(result, Err(KveError::Unauthenticated)));
    }

    #[tokio::test]
    async fn action_not_on_allowlist_is_denied() {
        let (executor, key) = make_executor();
        let result = executor.execute(&key, 100, req("orders.delete")).await;
        assert!(matches!(result, Err(KveError::NotAllowlisted(_, _))));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let (executor, key) = make_executor();
        let result = executor.execute(&key, 100_000, req("orders.refund")).await;
        assert!(matches!(result, Err(KveError::PayloadTooLarge)));
    }

    #[tokio::test]
    async fn handler_failure_produces_redacted_error_response() {
        let service_keys = Arc::new(InMemoryServiceKeys::new());
        let allowlist = Arc::new(InMemoryAllowlist::new());
        let tenant_integrations = Arc::new(InMemoryTenantIntegrations::new());
        let secrets = Arc::new(InMemorySecretStore::new());
        let raw_key = "sk_live_service_key";
        let pepper = "test-pepper";
        service_keys.insert(ServiceKeyRecord {
            key_id: "svc1".to_string(),
            name: "shopify service key".to_string(),
            organisation_id: Some("org1".to_string()),
            allowed_tenant_ids: vec!["tenant1".to_string()],
            key_hash: hash_api_key(pepper, raw_key),
            created_at: Utc::now(),
            expires_at: None,
            revoked_at: None,
            last_used_at: None,
        });
        allowlist.allow("shopify", "orders.refund");
        tenant_integrations.insert(TenantIntegration {
            tenant_id: "tenant1".to_string(),
            integration: "shopify".to_string(),
            credential_ref: "cred-1".to_string(),
            enabled: true,
            metadata: serde_json::json!({}),
        });
        secrets.put("cred-1", "shpat_secret_token");
        let mut executor = Executor::new(service_keys, allowlist, tenant_integrations, secrets, pepper);
        executor.register_handler(Arc::new(FailingHandler::new("shopify")));

        let response = executor.execute(raw_key, 100, req("orders.refund")).await.unwrap();
        assert!(!response.ok);
        assert_eq!(response.status, ExecuteStatus::Error);
    }
}
