//! Narrow adapter traits for the executor's I/O surface, mirroring the
//! kernel's adapter split.

use async_trait::async_trait;
use serde_json::Value;

use acp_types::{ServiceKeyRecord, TenantIntegration};

use crate::error::Result;

#[async_trait]
pub trait ServiceKeyStore: Send + Sync {
    async fn find_by_key_hash(&self, key_hash: &str) -> Result<Option<ServiceKeyRecord>>;
}

#[async_trait]
pub trait AllowlistStore: Send + Sync {
    async fn is_allowed(&self, integration: &str, action: &str) -> Result<bool>;
}

#[async_trait]
pub trait TenantIntegrationStore: Send + Sync {
    async fn find(&self, tenant_id: &str, integration: &str) -> Result<Option<TenantIntegration>>;
}

/// Resolves an opaque `credential_ref` to the actual secret material held by
/// an external secret manager. Implementations never log the returned value.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn read_secret(&self, credential_ref: &str) -> Result<Option<String>>;
}

/// Per-integration dispatcher: issues the external HTTP/GraphQL call using
/// the resolved token and tenant-integration metadata.
#[async_trait]
pub trait IntegrationHandler: Send + Sync {
    fn integration(&self) -> &str;

    async fn execute(
        &self,
        action: &str,
        params: &Value,
        token: &str,
        tenant_id: &str,
        metadata: &Value,
    ) -> Result<IntegrationOutcome>;
}

pub struct IntegrationOutcome {
    pub data: Value,
    pub result_meta: Option<Value>,
    pub upstream_http_status: u16,
    pub upstream_request_id: Option<String>,
}

pub mod memory;
