//! The kernel's only I/O surface. Each adapter is a narrow interface; the
//! router depends on these traits alone, never on a concrete implementation.

use async_trait::async_trait;
use serde_json::Value;

use acp_types::{ApiKeyRecord, Decision};

use crate::error::Result;

/// Tenant-scoped CRUD for the kernel's own API key table. Every method takes
/// an explicit tenant id and must never return rows outside it.
#[async_trait]
pub trait DbAdapter: Send + Sync {
    async fn find_api_key(&self, tenant_id: &str, prefix: &str) -> Result<Option<ApiKeyRecord>>;
    async fn insert_api_key(&self, record: ApiKeyRecord) -> Result<()>;
    async fn list_api_keys(&self, tenant_id: &str) -> Result<Vec<ApiKeyRecord>>;
    async fn revoke_api_key(&self, tenant_id: &str, key_id: &str) -> Result<bool>;
}

/// Primary audit sink. `log` is a deprecated shim retained for one release
/// that adapts a legacy flat entry into an
/// [`acp_types::AuditEvent`] before delegating to `log_event`.
#[async_trait]
pub trait AuditAdapter: Send + Sync {
    async fn log_event(&self, event: acp_types::AuditEvent) -> Result<()>;

    async fn log(&self, legacy_entry: Value) -> Result<()> {
        tracing::warn!("AuditAdapter::log is deprecated, ignoring legacy entry shape");
        let _ = legacy_entry;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct ReplayResponse {
    pub data: Value,
}

impl ReplayResponse {
    pub fn new(data: Value) -> Self {
        Self { data }
    }
}

/// `(tenant, action, idempotency_key)` keyed replay store.
#[async_trait]
pub trait IdempotencyAdapter: Send + Sync {
    async fn get_replay(
        &self,
        tenant_id: &str,
        action: &str,
        key: &str,
    ) -> Result<Option<ReplayResponse>>;

    async fn store_replay(
        &self,
        tenant_id: &str,
        action: &str,
        key: &str,
        response: ReplayResponse,
    ) -> Result<()>;
}

#[derive(Clone, Copy, Debug)]
pub struct RateLimitStatus {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
}

/// Fixed-window counter per `(api_key_id, action)`.
#[async_trait]
pub trait RateLimitAdapter: Send + Sync {
    async fn check(&self, api_key_id: &str, action: &str, limit: u32) -> Result<RateLimitStatus>;
}

/// Hard per-action ceilings on mutations.
#[async_trait]
pub trait CeilingsAdapter: Send + Sync {
    async fn check(&self, action: &str, params: &Value, tenant_id: &str) -> Result<()>;
    async fn usage(&self, ceiling_name: &str, tenant_id: &str) -> Result<f64>;
}

pub struct AuthorizeRequest {
    pub kernel_id: String,
    pub tenant_id: String,
    pub actor_id: String,
    pub action: String,
    pub request_hash: String,
    pub params_summary: Value,
}

/// The policy call to the Governance Hub.
#[async_trait]
pub trait ControlPlaneAdapter: Send + Sync {
    async fn authorize(&self, req: AuthorizeRequest) -> Result<Decision>;
}

pub struct ExecutorOutcome {
    pub data: Value,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub count: Option<u64>,
}

/// Dispatches mutation handlers to the Key-Vault Executor or an equivalent
/// endpoint-style backend. `trace` is required on the signature;
/// implementations that don't need it may ignore the value.
#[async_trait]
pub trait ExecutorAdapter: Send + Sync {
    async fn execute(
        &self,
        endpoint: &str,
        params: &Value,
        tenant_id: &str,
        trace: &str,
    ) -> Result<ExecutorOutcome>;
}
pub mod memory;
