//! In-process adapter shims wiring a real [`acp_hub::Hub`] and
//! [`acp_kve::Executor`] into a kernel [`acp_kernel::Router`] without going
//! over HTTP, so cross-service invariants can be exercised against the real
//! decision engine and executor pipeline rather than the kernel's own
//! in-memory stand-ins.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use acp_hub::{Hub, InMemoryStorage};
use acp_kernel::adapters::{
    AuthorizeRequest as KernelAuthorizeRequest, ControlPlaneAdapter, ExecutorAdapter, ExecutorOutcome,
};
use acp_kernel::error::{Result as KernelResult, RouterError};
use acp_kve::adapters::memory::{InMemoryAllowlist, InMemorySecretStore, InMemoryServiceKeys, InMemoryTenantIntegrations};
use acp_kve::Executor as KveExecutorImpl;
use acp_types::{ActionName, Decision, DecisionId};

/// Routes the kernel's authorize calls straight into a real [`Hub`]'s
/// decision engine, stamping a fixed organisation id (one organisation per
/// kernel in this deployment shape).
pub struct InProcessControlPlane {
    hub: Arc<Hub<InMemoryStorage>>,
    organisation_id: String,
}

impl InProcessControlPlane {
    pub fn new(hub: Arc<Hub<InMemoryStorage>>, organisation_id: impl Into<String>) -> Self {
        Self {
            hub,
            organisation_id: organisation_id.into(),
        }
    }
}

#[async_trait]
impl ControlPlaneAdapter for InProcessControlPlane {
    async fn authorize(&self, req: KernelAuthorizeRequest) -> KernelResult<Decision> {
        let result = self
            .hub
            .decisions
            .authorize(acp_hub::AuthorizeRequest {
                organisation_id: self.organisation_id.clone(),
                kernel_id: req.kernel_id,
                tenant_id: req.tenant_id,
                actor_type: "agent".to_string(),
                action: req.action,
                request_hash: req.request_hash,
                params_summary: req.params_summary,
                is_mutation: true,
            })
            .await
            .map_err(|e| RouterError::Internal(e.to_string()))?;
        Ok(result.decision)
    }
}

/// Routes the kernel's executor calls into a real [`KveExecutorImpl`]
/// in-process, skipping the HTTP hop `acp-kernel-server`'s `HttpExecutor`
/// would otherwise make.
pub struct InProcessExecutor {
    executor: Arc<KveExecutorImpl<InMemoryServiceKeys, InMemoryAllowlist, InMemoryTenantIntegrations, InMemorySecretStore>>,
    presented_service_key: String,
}

impl InProcessExecutor {
    pub fn new(
        executor: Arc<KveExecutorImpl<InMemoryServiceKeys, InMemoryAllowlist, InMemoryTenantIntegrations, InMemorySecretStore>>,
        presented_service_key: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            presented_service_key: presented_service_key.into(),
        }
    }
}

#[async_trait]
impl ExecutorAdapter for InProcessExecutor {
    async fn execute(&self, endpoint: &str, params: &Value, tenant_id: &str, trace: &str) -> KernelResult<ExecutorOutcome> {
        let (integration, action) = endpoint
            .split_once('.')
            .ok_or_else(|| RouterError::Internal(format!("malformed executor endpoint '{endpoint}'")))?;

        let request_hash = acp_types::canonical::request_hash(tenant_id, endpoint, params);
        let req = acp_types::ExecuteRequest {
            request_id: Default::default(),
            tenant_id: tenant_id.to_string(),
            integration: integration.to_string(),
            action: ActionName::new(action),
            params: params.clone(),
            request_hash,
            trace: Some(trace.to_string()),
            dry_run: false,
        };

        let serialized_len = serde_json::to_vec(&req).map(|v| v.len()).unwrap_or(0);
        let response = self
            .executor
            .execute(&self.presented_service_key, serialized_len, req)
            .await
            .map_err(|e| RouterError::Internal(e.to_string()))?;

        if !response.ok {
            return Err(RouterError::Internal(
                response
                    .error_message_redacted
                    .unwrap_or_else(|| "executor call failed".to_string()),
            ));
        }

        Ok(ExecutorOutcome {
            data: response.data.unwrap_or(Value::Null),
            resource_type: None,
            resource_id: None,
            count: None,
        })
    }
}

/// Unused placeholder kept for symmetry with the kernel's decision id helper;
/// in-process callers never need to mint their own.
pub fn _unused_decision_id() -> DecisionId {
    DecisionId::new()
}
