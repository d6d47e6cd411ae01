//! In-memory storage implementation for tests and the conformance suite.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use acp_types::{
    AuditEvent, AuditPage, AuditQuery, KernelInventoryRecord, Policy, RevocationEntry,
    RevocationsSnapshot,
};

use crate::error::Result;
use crate::storage::{AuditStorage, PolicyStorage, RegistryStorage, RevocationStorage};

#[derive(Default)]
pub struct InMemoryStorage {
    policies: DashMap<String, Vec<Policy>>,
    hot_events: DashMap<String, AuditEvent>,
    cold_blobs: DashMap<String, Vec<u8>>,
    revocations: DashMap<String, (u64, Vec<RevocationEntry>)>,
    kernels_by_hmac: DashMap<String, KernelInventoryRecord>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PolicyStorage for InMemoryStorage {
    async fn list_policies(&self, organisation_id: &str) -> Result<Vec<Policy>> {
        Ok(self
            .policies
            .get(organisation_id)
            .map(|v| v.clone())
            .unwrap_or_default())
    }

    async fn upsert_policy(&self, policy: Policy) -> Result<()> {
        let mut entry = self.policies.entry(policy.organisation_id.clone()).or_default();
        if let Some(existing) = entry.iter_mut().find(|p| p.id == policy.id) {
            *existing = policy;
        } else {
            entry.push(policy);
        }
        Ok(())
    }
}

#[async_trait]
impl AuditStorage for InMemoryStorage {
    async fn insert_hot(&self, event: AuditEvent) -> Result<bool> {
        let key = event.event_id.to_string();
        if self.hot_events.contains_key(&key) {
            return Ok(false);
        }
        self.hot_events.insert(key, event);
        Ok(true)
    }

    async fn insert_cold_blob(&self, event_id: &str, compressed: Vec<u8>) -> Result<()> {
        self.cold_blobs.insert(event_id.to_string(), compressed);
        Ok(())
    }

    async fn query(&self, query: AuditQuery) -> Result<AuditPage> {
        let mut events: Vec<AuditEvent> = self
            .hot_events
            .iter()
            .map(|e| e.value().clone())
            .filter(|e| e.tenant_id == query.tenant_id)
            .filter(|e| query.action.as_deref().map(|a| e.action.0 == a).unwrap_or(true))
            .filter(|e| query.status.map(|s| s == e.status).unwrap_or(true))
            .filter(|e| query.since.map(|s| e.occurred_at >= s).unwrap_or(true))
            .filter(|e| query.until.map(|u| e.occurred_at <= u).unwrap_or(true))
            .collect();
        events.sort_by_key(|e| e.occurred_at);
        events.truncate(query.limit as usize);
        Ok(AuditPage {
            events,
            next_cursor: None,
        })
    }
}

#[async_trait]
impl RevocationStorage for InMemoryStorage {
    async fn append(&self, kernel_scope: &str, entry: RevocationEntry) -> Result<u64> {
        let mut slot = self
            .revocations
            .entry(kernel_scope.to_string())
            .or_insert((0, Vec::new()));
        slot.0 += 1;
        slot.1.push(entry);
        Ok(slot.0)
    }

    async fn snapshot(&self, kernel_scope: &str) -> Result<RevocationsSnapshot> {
        let slot = self.revocations.get(kernel_scope);
        let (version, entries) = slot
            .map(|s| (s.0, s.1.clone()))
            .unwrap_or((0, Vec::new()));
        Ok(RevocationsSnapshot {
            version,
            generated_at: Utc::now(),
            entries,
        })
    }
}

#[async_trait]
impl RegistryStorage for InMemoryStorage {
    async fn upsert_kernel(&self, record: KernelInventoryRecord) -> Result<()> {
        self.kernels_by_hmac.insert(record.api_key_hmac.clone(), record);
        Ok(())
    }

    async fn find_kernel_by_hmac(&self, hmac: &str) -> Result<Option<KernelInventoryRecord>> {
        Ok(self.kernels_by_hmac.get(hmac).map(|r| r.clone()))
    }
}
