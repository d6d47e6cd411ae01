//! Revocation snapshots and kernel inventory records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single revoked subject — an API key, a service key, or an entire tenant.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "subject_type", rename_all = "snake_case")]
pub enum RevokedSubject {
    ApiKey { key_id: String },
    ServiceKey { key_id: String },
    Tenant { tenant_id: String },
    Kernel { kernel_id: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevocationEntry {
    pub subject: RevokedSubject,
    pub revoked_at: DateTime<Utc>,
    pub reason: Option<String>,
}

/// The full revocation list at a point in time, versioned so kernels can
/// detect staleness of their pulled copy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevocationsSnapshot {
    pub version: u64,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<RevocationEntry>,
}

impl RevocationsSnapshot {
    pub fn is_revoked(&self, subject: &RevokedSubject) -> bool {
        self.entries.iter().any(|e| match (&e.subject, subject) {
            (RevokedSubject::ApiKey { key_id: a }, RevokedSubject::ApiKey { key_id: b }) => a == b,
            (RevokedSubject::ServiceKey { key_id: a }, RevokedSubject::ServiceKey { key_id: b }) => {
                a == b
            }
            (RevokedSubject::Tenant { tenant_id: a }, RevokedSubject::Tenant { tenant_id: b }) => {
                a == b
            }
            (RevokedSubject::Kernel { kernel_id: a }, RevokedSubject::Kernel { kernel_id: b }) => {
                a == b
            }
            _ => false,
        })
    }
}

/// A kernel's self-reported inventory, submitted on heartbeat.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KernelInventoryRecord {
    pub kernel_id: String,
    pub organisation_id: String,
    pub tenant_id: String,
    /// `HMAC-SHA-256(server_pepper, kernel_api_key)`; the raw key is never stored.
    pub api_key_hmac: String,
    pub installed_packs: Vec<String>,
    pub kernel_version: String,
    pub env: String,
    pub status: KernelStatus,
    pub revocations_version_seen: u64,
    pub last_heartbeat_at: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelStatus {
    Active,
    Degraded,
}
