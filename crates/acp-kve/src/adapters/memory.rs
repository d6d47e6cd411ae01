//! In-memory adapter implementations for tests and the conformance suite.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use acp_types::{ServiceKeyRecord, TenantIntegration};

use crate::adapters::{
    AllowlistStore, IntegrationHandler, IntegrationOutcome, SecretStore, ServiceKeyStore,
    TenantIntegrationStore,
};
use crate::error::{KveError, Result};

#[derive(Default)]
pub struct InMemoryServiceKeys {
    by_hash: DashMap<String, ServiceKeyRecord>,
}

impl InMemoryServiceKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, record: ServiceKeyRecord) {
        self.by_hash.insert(record.key_hash.clone(), record);
    }
}

#[async_trait]
impl ServiceKeyStore for InMemoryServiceKeys {
    async fn find_by_key_hash(&self, key_hash: &str) -> Result<Option<ServiceKeyRecord>> {
        Ok(self.by_hash.get(key_hash).map(|r| r.clone()))
    }
}

#[derive(Default)]
pub struct InMemoryAllowlist {
    entries: DashMap<(String, String), bool>,
}

impl InMemoryAllowlist {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(&self, integration: &str, action: &str) {
        self.entries
            .insert((integration.to_string(), action.to_string()), true);
    }
}

#[async_trait]
impl AllowlistStore for InMemoryAllowlist {
    async fn is_allowed(&self, integration: &str, action: &str) -> Result<bool> {
        Ok(self
            .entries
            .get(&(integration.to_string(), action.to_string()))
            .map(|v| *v)
            .unwrap_or(false))
    }
}

#[derive(Default)]
pub struct InMemoryTenantIntegrations {
    entries: DashMap<(String, String), TenantIntegration>,
}

impl InMemoryTenantIntegrations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, integration: TenantIntegration) {
        self.entries.insert(
            (integration.tenant_id.clone(), integration.integration.clone()),
            integration,
        );
    }
}

#[async_trait]
impl TenantIntegrationStore for InMemoryTenantIntegrations {
    async fn find(&self, tenant_id: &str, integration: &str) -> Result<Option<TenantIntegration>> {
        Ok(self
            .entries
            .get(&(tenant_id.to_string(), integration.to_string()))
            .map(|v| v.clone()))
    }
}

#[derive(Default)]
pub struct InMemorySecretStore {
    secrets: DashMap<String, String>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, credential_ref: &str, secret: &str) {
        self.secrets.insert(credential_ref.to_string(), secret.to_string());
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn read_secret(&self, credential_ref: &str) -> Result<Option<String>> {
        Ok(self.secrets.get(credential_ref).map(|v| v.clone()))
    }
}

/// Stand-in for the per-integration handlers (Shopify, CIQ, ...) that sit
/// outside this system's scope: echoes the call back as `data` so the
/// pipeline around it is fully exercised without a real upstream dependency.
pub struct EchoHandler {
    integration: String,
}

impl EchoHandler {
    pub fn new(integration: impl Into<String>) -> Self {
        Self {
            integration: integration.into(),
        }
    }
}

#[async_trait]
impl IntegrationHandler for EchoHandler {
    fn integration(&self) -> &str {
        &self.integration
    }

    async fn execute(
        &self,
        action: &str,
        params: &Value,
        _token: &str,
        _tenant_id: &str,
        _metadata: &Value,
    ) -> Result<IntegrationOutcome> {
        Ok(IntegrationOutcome {
            data: serde_json::json!({ "action": action, "echo": params }),
            result_meta: None,
            upstream_http_status: 200,
            upstream_request_id: Some(format!("echo-{}", uuid::Uuid::new_v4())),
        })
    }
}

/// A handler that always fails, for exercising the error path.
pub struct FailingHandler {
    integration: String,
}

impl FailingHandler {
    pub fn new(integration: impl Into<String>) -> Self {
        Self {
            integration: integration.into(),
        }
    }
}

#[async_trait]
impl IntegrationHandler for FailingHandler {
    fn integration(&self) -> &str {
        &self.integration
    }

    async fn execute(
        &self,
        _action: &str,
        _params: &Value,
        _token: &str,
        _tenant_id: &str,
        _metadata: &Value,
    ) -> Result<IntegrationOutcome> {
        Err(KveError::HandlerFailed("upstream unavailable".to_string()))
    }
}
