//! `ControlPlaneAdapter`/`ExecutorAdapter` implementations that call the
//! Governance Hub and Key-Vault Executor over HTTP, the wiring a real kernel
//! install uses in place of the in-memory stand-ins.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use acp_kernel::adapters::{
    AuthorizeRequest as KernelAuthorizeRequest, ControlPlaneAdapter, ExecutorAdapter, ExecutorOutcome,
};
use acp_kernel::error::{Result, RouterError};
use acp_types::{ApprovalId, Decision, DecisionId, PolicyId};

pub struct HttpControlPlane {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl HttpControlPlane {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_millis(900))
                .build()
                .expect("reqwest client builds with static config"),
            base_url: base_url.into(),
            service_key: service_key.into(),
        }
    }
}

#[derive(Serialize)]
struct AuthorizeWireRequest<'a> {
    tenant_id: &'a str,
    actor_type: &'a str,
    action: &'a str,
    request_hash: &'a str,
    params_summary: &'a Value,
    is_mutation: bool,
}

#[derive(Deserialize)]
struct AuthorizeWireResponse {
    decision_id: String,
    decision: String,
    matched_policy: Option<String>,
    reason: Option<String>,
    approval_id: Option<String>,
    policy_version: String,
}

#[async_trait]
impl ControlPlaneAdapter for HttpControlPlane {
    async fn authorize(&self, req: KernelAuthorizeRequest) -> Result<Decision> {
        // actor_type is not yet modeled on kernel-side requests; the hub
        // treats it as advisory (used only by `ActorTypeIs` conditions).
        let wire = AuthorizeWireRequest {
            tenant_id: &req.tenant_id,
            actor_type: "agent",
            action: &req.action,
            request_hash: &req.request_hash,
            params_summary: &req.params_summary,
            is_mutation: true,
        };

        let response = self
            .client
            .post(format!("{}/authorize", self.base_url))
            .bearer_auth(&self.service_key)
            .json(&wire)
            .send()
            .await
            .map_err(|e| RouterError::Internal(format!("hub request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(RouterError::GovernanceUnavailable);
        }

        let body: AuthorizeWireResponse = response
            .json()
            .await
            .map_err(|e| RouterError::Internal(format!("invalid hub response: {e}")))?;

        // The wire decision_id/approval_id are display strings (`dec_...`,
        // `apr_...`); the kernel only needs a locally-unique handle to key its
        // decision cache, so it mints its own rather than parsing them back.
        let _ = body.decision_id;
        let decision_id = DecisionId::new();
        let matched_policy = body.matched_policy.map(PolicyId);

        let decision = match body.decision.as_str() {
            "allow" => Decision::Allow {
                decision_id,
                matched_policy,
                policy_version: body.policy_version,
            },
            "require_approval" => {
                let _ = body.approval_id;
                Decision::RequireApproval {
                    decision_id,
                    approval_id: ApprovalId::new(),
                    matched_policy,
                    policy_version: body.policy_version,
                }
            }
            _ => Decision::Deny {
                decision_id,
                matched_policy,
                reason: body.reason.unwrap_or_else(|| "denied by governance hub".to_string()),
                policy_version: body.policy_version,
            },
        };

        Ok(decision)
    }
}

pub struct HttpExecutor {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl HttpExecutor {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .expect("reqwest client builds with static config"),
            base_url: base_url.into(),
            service_key: service_key.into(),
        }
    }
}

#[derive(Serialize)]
struct ExecuteWireRequest<'a> {
    tenant_id: &'a str,
    integration: &'a str,
    action: &'a str,
    params: &'a Value,
    request_hash: &'a str,
    trace: &'a str,
}

#[derive(Deserialize)]
struct ExecuteWireResponse {
    ok: bool,
    data: Option<Value>,
    error_message_redacted: Option<String>,
}

#[async_trait]
impl ExecutorAdapter for HttpExecutor {
    async fn execute(
        &self,
        endpoint: &str,
        params: &Value,
        tenant_id: &str,
        trace: &str,
    ) -> Result<ExecutorOutcome> {
        // `endpoint` is "<integration>.<action>"; the executor's allowlist
        // is keyed on the two parts separately.
        let (integration, action) = endpoint
            .split_once('.')
            .ok_or_else(|| RouterError::Internal(format!("malformed executor endpoint '{endpoint}'")))?;

        let wire = ExecuteWireRequest {
            tenant_id,
            integration,
            action,
            params,
            request_hash: &acp_types::canonical::request_hash(tenant_id, endpoint, params),
            trace,
        };

        let response = self
            .client
            .post(format!("{}/execute", self.base_url))
            .bearer_auth(&self.service_key)
            .json(&wire)
            .send()
            .await
            .map_err(|e| RouterError::Internal(format!("executor request failed: {e}")))?;

        let body: ExecuteWireResponse = response
            .json()
            .await
            .map_err(|e| RouterError::Internal(format!("invalid executor response: {e}")))?;

        if !body.ok {
            return Err(RouterError::Internal(
                body.error_message_redacted
                    .unwrap_or_else(|| "executor call failed".to_string()),
            ));
        }

        Ok(ExecutorOutcome {
            data: body.data.unwrap_or(Value::Null),
            resource_type: None,
            resource_id: None,
            count: None,
        })
    }
}
