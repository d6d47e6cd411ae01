//! Key-Vault Executor wire types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::ActionName;
use crate::ids::RequestId;

/// A service key hashed at rest like kernel API keys. Scoped to an
/// organisation and a set of tenants within it, not to a single integration
/// — the allowlist is what restricts which actions it can drive.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceKeyRecord {
    pub key_id: String,
    pub name: String,
    /// `None` means the key is not scoped to a single organisation. In
    /// practice every minted key carries one; the field stays optional to
    /// match the provisioning record it is minted from.
    #[serde(default)]
    pub organisation_id: Option<String>,
    /// Tenants this key may act on behalf of. Empty means no tenant is
    /// authorized — wildcard access is not supported.
    #[serde(default)]
    pub allowed_tenant_ids: Vec<String>,
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ServiceKeyRecord {
    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|exp| now >= exp).unwrap_or(false)
    }
}

/// Which actions a given integration's service key is allowed to execute.
/// Unique on `(integration, action)`; `action_version` records the
/// allowlisted contract version and `enabled` lets an entry be disabled
/// without deleting it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionAllowlistEntry {
    pub integration: String,
    pub action: ActionName,
    pub action_version: String,
    pub enabled: bool,
}

/// A tenant's configured connection to an external integration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TenantIntegration {
    pub tenant_id: String,
    pub integration: String,
    /// Opaque reference into the secret store; never the secret itself.
    pub credential_ref: String,
    pub enabled: bool,
    /// Integration-specific configuration (e.g. a base URL, account id)
    /// passed to the handler alongside the resolved secret.
    #[serde(default)]
    pub metadata: Value,
}

/// `POST /execute` body: `{ tenant_id, integration,
/// action, params, request_hash, trace }`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecuteRequest {
    #[serde(default)]
    pub request_id: RequestId,
    pub tenant_id: String,
    pub integration: String,
    pub action: ActionName,
    pub params: Value,
    pub request_hash: String,
    #[serde(default)]
    pub trace: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteStatus {
    Success,
    Error,
}

/// What the upstream third-party call returned, stripped of body content.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpstreamMeta {
    pub http_status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// The executor's response. `data` is already sanitized of secrets before
/// it reaches this struct.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub ok: bool,
    pub status: ExecuteStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message_redacted: Option<String>,
    pub upstream: UpstreamMeta,
}
