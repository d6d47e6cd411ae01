//! The request envelope, response envelope, and per-request context threaded
//! through the pipeline.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use acp_types::{ErrorCode, RequestId};

use crate::adapters::{
    AuditAdapter, CeilingsAdapter, ControlPlaneAdapter, DbAdapter, ExecutorAdapter,
    IdempotencyAdapter, RateLimitAdapter,
};
use crate::bindings::KernelRuntimeBindings;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManageRequest {
    pub action: String,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum ManageResponse {
    Ok {
        ok: bool,
        request_id: String,
        data: Value,
        dry_run: bool,
        constraints_applied: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<&'static str>,
    },
    Err {
        ok: bool,
        request_id: String,
        error: String,
        code: &'static str,
        #[serde(skip)]
        http_status: u16,
    },
}

impl ManageResponse {
    pub fn ok(request_id: RequestId, data: Value, dry_run: bool, constraints_applied: Vec<String>) -> Self {
        ManageResponse::Ok {
            ok: true,
            request_id: request_id.to_string(),
            data,
            dry_run,
            constraints_applied,
            code: None,
        }
    }

    pub fn replay(request_id: RequestId, data: Value) -> Self {
        ManageResponse::Ok {
            ok: true,
            request_id: request_id.to_string(),
            data,
            dry_run: false,
            constraints_applied: vec![],
            code: Some(ErrorCode::IdempotentReplay.as_str()),
        }
    }

    /// Builds an error response with the default transport status for
    /// `code`. Callers that need to override the status for a specific
    /// error variant (e.g. a 413 for an oversized payload) should use
    /// [`Self::err_with_status`] instead.
    pub fn err(request_id: RequestId, error: impl Into<String>, code: ErrorCode) -> Self {
        Self::err_with_status(request_id, error, code, code.http_status())
    }

    pub fn err_with_status(request_id: RequestId, error: impl Into<String>, code: ErrorCode, http_status: u16) -> Self {
        ManageResponse::Err {
            ok: false,
            request_id: request_id.to_string(),
            error: error.into(),
            code: code.as_str(),
            http_status,
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            ManageResponse::Ok { .. } => 200,
            ManageResponse::Err { http_status, .. } => *http_status,
        }
    }
}

/// Bundles every adapter the router needs for one request. Constructed once
/// per kernel instance and shared across requests (adapters must be `Sync`).
#[derive(Clone)]
pub struct Adapters {
    pub db: Arc<dyn DbAdapter>,
    pub audit: Arc<dyn AuditAdapter>,
    pub idempotency: Arc<dyn IdempotencyAdapter>,
    pub rate_limit: Arc<dyn RateLimitAdapter>,
    pub ceilings: Arc<dyn CeilingsAdapter>,
    pub control_plane: Option<Arc<dyn ControlPlaneAdapter>>,
    pub executor: Arc<dyn ExecutorAdapter>,
}

/// Threaded through handler invocation.
pub struct RequestContext {
    pub request_id: RequestId,
    pub tenant_id: String,
    pub api_key_id: String,
    pub scopes: Vec<String>,
    pub dry_run: bool,
    pub adapters: Adapters,
    pub bindings: KernelRuntimeBindings,
    pub started_at: DateTime<Utc>,
    pub client_ip: Option<String>,
}

impl RequestContext {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }

    pub fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}
