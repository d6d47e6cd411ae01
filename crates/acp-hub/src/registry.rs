//! Kernel registry and heartbeat.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use acp_types::{KernelInventoryRecord, KernelStatus};

use crate::error::{HubError, Result};
use crate::hmac_auth::hash_api_key;
use crate::storage::RegistryStorage;

/// Heartbeats older than this flip a kernel's status to `degraded` on the
/// next read.
const DEGRADED_AFTER: Duration = Duration::from_secs(120);

pub struct HeartbeatRequest {
    pub kernel_id: String,
    pub organisation_id: String,
    pub tenant_id: String,
    pub presented_api_key: String,
    pub kernel_version: String,
    pub installed_packs: Vec<String>,
    pub env: String,
}

pub struct HeartbeatResponse {
    pub kernel_registered: bool,
    pub policy_version: Option<String>,
    pub revocations_version: u64,
}

pub struct RegistryService<S> {
    storage: Arc<S>,
    pepper: String,
}

impl<S: RegistryStorage> RegistryService<S> {
    pub fn new(storage: Arc<S>, pepper: impl Into<String>) -> Self {
        Self {
            storage,
            pepper: pepper.into(),
        }
    }

    /// Verifies the presented kernel API key by HMAC comparison and
    /// registers/refreshes the inventory row.
    pub async fn heartbeat(
        &self,
        req: HeartbeatRequest,
        policy_version: Option<String>,
        revocations_version: u64,
    ) -> Result<HeartbeatResponse> {
        let api_key_hmac = hash_api_key(&self.pepper, &req.presented_api_key);
        let existing = self.storage.find_kernel_by_hmac(&api_key_hmac).await?;

        let record = KernelInventoryRecord {
            kernel_id: req.kernel_id,
            organisation_id: req.organisation_id,
            tenant_id: req.tenant_id,
            api_key_hmac,
            installed_packs: req.installed_packs,
            kernel_version: req.kernel_version,
            env: req.env,
            status: KernelStatus::Active,
            revocations_version_seen: revocations_version,
            last_heartbeat_at: Utc::now(),
            registered_at: existing
                .as_ref()
                .map(|e| e.registered_at)
                .unwrap_or_else(Utc::now),
        };
        self.storage.upsert_kernel(record).await?;

        Ok(HeartbeatResponse {
            kernel_registered: true,
            policy_version,
            revocations_version,
        })
    }

    /// Verifies a presented key against a known `api_key_hmac`, returning
    /// the kernel's current record with its effective status (active vs.
    /// degraded from a stale heartbeat).
    pub async fn lookup(&self, presented_api_key: &str) -> Result<KernelInventoryRecord> {
        let api_key_hmac = hash_api_key(&self.pepper, presented_api_key);
        let mut record = self
            .storage
            .find_kernel_by_hmac(&api_key_hmac)
            .await?
            .ok_or_else(|| HubError::Unauthenticated)?;

        let since_last = Utc::now().signed_duration_since(record.last_heartbeat_at);
        if since_last.to_std().unwrap_or(Duration::ZERO) > DEGRADED_AFTER {
            record.status = KernelStatus::Degraded;
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStorage;

    fn req() -> HeartbeatRequest {
        HeartbeatRequest {
            kernel_id: "kernel1".to_string(),
            organisation_id: "org1".to_string(),
            tenant_id: "t1".to_string(),
            presented_api_key: "kernel-api-key".to_string(),
            kernel_version: "1.0.0".to_string(),
            installed_packs: vec!["domain".to_string()],
            env: "production".to_string(),
        }
    }

    #[tokio::test]
    async fn heartbeat_registers_and_lookup_succeeds_with_same_key() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = RegistryService::new(storage, "pepper");
        let response = service.heartbeat(req(), Some("v1".to_string()), 3).await.unwrap();
        assert!(response.kernel_registered);
        assert_eq!(response.revocations_version, 3);

        let record = service.lookup("kernel-api-key").await.unwrap();
        assert_eq!(record.kernel_id, "kernel1");
        assert_eq!(record.status, KernelStatus::Active);
    }

    #[tokio::test]
    async fn lookup_with_wrong_key_is_unauthenticated() {
        let storage = Arc::new(InMemoryStorage::new());
        let service = RegistryService::new(storage, "pepper");
        service.heartbeat(req(), None, 0).await.unwrap();
        let result = service.lookup("wrong-key").await;
        assert!(matches!(result, Err(HubError::Unauthenticated)));
    }
}
