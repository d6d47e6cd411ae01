//! Audit event shape emitted by the kernel and ingested by the hub.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::ActionName;
use crate::ids::{DecisionId, EventId, RequestId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    Agent,
    Human,
    Service,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActorRef {
    #[serde(rename = "type")]
    pub actor_type: ActorType,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Success,
    Error,
    Denied,
}

/// Result metadata derived from a handler's impact shape.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResultMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids_created: Vec<String>,
}

/// How a decision was reached — an authoritative hub call, or a local
/// degradation fallback under an adapter outage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionSource {
    Hub,
    KernelDegraded,
}

/// Current audit event schema revision. Bump whenever a field is added,
/// removed, or changes meaning.
pub const AUDIT_EVENT_VERSION: u32 = 1;
pub const AUDIT_SCHEMA_VERSION: u32 = 1;

/// A single append-only audit event.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: EventId,
    pub event_version: u32,
    pub schema_version: u32,
    pub request_id: RequestId,
    pub tenant_id: String,
    pub integration: String,
    pub pack: String,
    pub actor: ActorRef,
    pub action: ActionName,
    pub status: AuditStatus,
    /// Sanitized, flat subset of the request params.
    pub params_summary: Value,
    /// SHA-256 of the canonicalized, sanitized request.
    pub request_hash: String,
    pub policy_decision_id: Option<DecisionId>,
    pub policy_version: Option<String>,
    pub decision_source: Option<DecisionSource>,
    pub degraded_reason: Option<String>,
    pub dry_run: bool,
    pub idempotency_key: Option<String>,
    pub error_code: Option<String>,
    pub error_message_redacted: Option<String>,
    pub latency_ms: Option<u64>,
    pub result: Option<ResultMeta>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditQuery {
    pub tenant_id: String,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub status: Option<AuditStatus>,
    #[serde(default)]
    pub since: Option<DateTime<Utc>>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    #[serde(default = "default_page_size")]
    pub limit: u32,
    #[serde(default)]
    pub cursor: Option<String>,
}

fn default_page_size() -> u32 {
    50
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditPage {
    pub events: Vec<AuditEvent>,
    pub next_cursor: Option<String>,
}
