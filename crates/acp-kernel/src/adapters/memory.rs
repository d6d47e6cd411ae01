//! In-memory adapter implementations used by tests and the conformance suite.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;

use acp_types::{ApiKeyRecord, ApiKeyStatus, Decision, DecisionId};

use crate::adapters::{
    AuthorizeRequest, CeilingsAdapter, ControlPlaneAdapter, DbAdapter, ExecutorAdapter,
    ExecutorOutcome, IdempotencyAdapter, RateLimitAdapter, RateLimitStatus, ReplayResponse,
};
use crate::error::{Result, RouterError};

#[derive(Default)]
pub struct InMemoryDb {
    keys: DashMap<(String, String), ApiKeyRecord>,
}

impl InMemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DbAdapter for InMemoryDb {
    async fn find_api_key(&self, tenant_id: &str, prefix: &str) -> Result<Option<ApiKeyRecord>> {
        Ok(self
            .keys
            .get(&(tenant_id.to_string(), prefix.to_string()))
            .map(|r| r.clone()))
    }

    async fn insert_api_key(&self, record: ApiKeyRecord) -> Result<()> {
        self.keys
            .insert((record.tenant_id.clone(), record.prefix.clone()), record);
        Ok(())
    }

    async fn list_api_keys(&self, tenant_id: &str) -> Result<Vec<ApiKeyRecord>> {
        Ok(self
            .keys
            .iter()
            .filter(|e| e.key().0 == tenant_id)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn revoke_api_key(&self, tenant_id: &str, key_id: &str) -> Result<bool> {
        for mut entry in self.keys.iter_mut() {
            if entry.tenant_id == tenant_id && entry.id == key_id {
                entry.status = ApiKeyStatus::Revoked;
                entry.revoked_at = Some(Utc::now());
                return Ok(true);
            }
        }
        Ok(false)
    }
}

#[derive(Default)]
pub struct InMemoryAudit {
    pub events: DashMap<String, acp_types::AuditEvent>,
}

impl InMemoryAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[async_trait]
impl crate::adapters::AuditAdapter for InMemoryAudit {
    async fn log_event(&self, event: acp_types::AuditEvent) -> Result<()> {
        // event_id uniqueness makes duplicate inserts a no-op.
        self.events.entry(event.event_id.to_string()).or_insert(event);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryIdempotency {
    store: DashMap<(String, String, String), ReplayResponse>,
}

impl InMemoryIdempotency {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdempotencyAdapter for InMemoryIdempotency {
    async fn get_replay(
        &self,
        tenant_id: &str,
        action: &str,
        key: &str,
    ) -> Result<Option<ReplayResponse>> {
        Ok(self
            .store
            .get(&(tenant_id.to_string(), action.to_string(), key.to_string()))
            .map(|r| r.clone()))
    }

    async fn store_replay(
        &self,
        tenant_id: &str,
        action: &str,
        key: &str,
        response: ReplayResponse,
    ) -> Result<()> {
        self.store
            .insert((tenant_id.to_string(), action.to_string(), key.to_string()), response);
        Ok(())
    }
}

/// Fixed-window counter, one window per `(api_key_id, action)`.
pub struct InMemoryRateLimit {
    windows: DashMap<(String, String), (i64, AtomicU64)>,
    window_ms: i64,
}

impl InMemoryRateLimit {
    pub fn new() -> Self {
        Self {
            windows: DashMap::new(),
            window_ms: 60_000,
        }
    }
}

impl Default for InMemoryRateLimit {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RateLimitAdapter for InMemoryRateLimit {
    async fn check(&self, api_key_id: &str, action: &str, limit: u32) -> Result<RateLimitStatus> {
        let now = Utc::now().timestamp_millis();
        let key = (api_key_id.to_string(), action.to_string());
        let mut entry = self
            .windows
            .entry(key)
            .or_insert_with(|| (now, AtomicU64::new(0)));
        if now - entry.0 >= self.window_ms {
            entry.0 = now;
            entry.1.store(0, Ordering::SeqCst);
        }
        let count = entry.1.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(RateLimitStatus {
            allowed: count <= limit as u64,
            limit,
            remaining: limit.saturating_sub(count as u32),
        })
    }
}

/// Static table of hard ceilings. No ceilings
/// configured in-memory pass unconditionally; tests that need to exercise a
/// breach construct one with `with_ceiling`.
pub struct InMemoryCeilings {
    ceilings: DashMap<String, f64>,
    usage: DashMap<String, f64>,
}

impl InMemoryCeilings {
    pub fn new() -> Self {
        Self {
            ceilings: DashMap::new(),
            usage: DashMap::new(),
        }
    }

    pub fn with_ceiling(self, action: &str, max: f64) -> Self {
        self.ceilings.insert(action.to_string(), max);
        self
    }
}

impl Default for InMemoryCeilings {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CeilingsAdapter for InMemoryCeilings {
    async fn check(&self, action: &str, params: &Value, tenant_id: &str) -> Result<()> {
        let Some(max) = self.ceilings.get(action).map(|v| *v) else {
            return Ok(());
        };
        let amount = params.get("amount").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let usage_key = format!("{tenant_id}:{action}");
        let mut usage = self.usage.entry(usage_key).or_insert(0.0);
        let projected = *usage + amount;
        if projected > max {
            return Err(RouterError::CeilingExceeded(format!(
                "{action} ceiling {max} exceeded"
            )));
        }
        *usage = projected;
        Ok(())
    }

    async fn usage(&self, ceiling_name: &str, tenant_id: &str) -> Result<f64> {
        Ok(self
            .usage
            .get(&format!("{tenant_id}:{ceiling_name}"))
            .map(|v| *v)
            .unwrap_or(0.0))
    }
}

/// Always allows every request with a synthetic decision. Stands in for the
/// Governance Hub in tests that don't exercise `acp-hub` directly.
pub struct AlwaysAllowControlPlane;

#[async_trait]
impl ControlPlaneAdapter for AlwaysAllowControlPlane {
    async fn authorize(&self, _req: AuthorizeRequest) -> Result<Decision> {
        Ok(Decision::Allow {
            decision_id: DecisionId::new(),
            matched_policy: None,
            policy_version: "v0".to_string(),
        })
    }
}

/// Returns an error, simulating a hub outage for degradation-policy tests.
pub struct UnreachableControlPlane;

#[async_trait]
impl ControlPlaneAdapter for UnreachableControlPlane {
    async fn authorize(&self, _req: AuthorizeRequest) -> Result<Decision> {
        Err(RouterError::GovernanceUnavailable)
    }
}

/// Echoes the request back as the executed result; stands in for the
/// Key-Vault Executor in tests.
pub struct EchoExecutor;

#[async_trait]
impl ExecutorAdapter for EchoExecutor {
    async fn execute(
        &self,
        endpoint: &str,
        params: &Value,
        _tenant_id: &str,
        _trace: &str,
    ) -> Result<ExecutorOutcome> {
        Ok(ExecutorOutcome {
            data: serde_json::json!({ "endpoint": endpoint, "echo": params }),
            resource_type: None,
            resource_id: None,
            count: None,
        })
    }
}
