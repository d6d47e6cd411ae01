//! Storage trait split: a narrow trait per concern plus one combined
//! supertrait, mirroring the kernel's adapter pattern.

use async_trait::async_trait;

use acp_types::{AuditEvent, AuditPage, AuditQuery, KernelInventoryRecord, Policy, RevocationEntry};

use crate::error::Result;

#[async_trait]
pub trait PolicyStorage: Send + Sync {
    async fn list_policies(&self, organisation_id: &str) -> Result<Vec<Policy>>;
    async fn upsert_policy(&self, policy: Policy) -> Result<()>;
}

#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Writes the hot index row. Duplicate `event_id` inserts are no-ops.
    async fn insert_hot(&self, event: AuditEvent) -> Result<bool>;
    /// Gzip-compressed canonical JSON blob, written asynchronously.
    async fn insert_cold_blob(&self, event_id: &str, compressed: Vec<u8>) -> Result<()>;
    async fn query(&self, query: AuditQuery) -> Result<AuditPage>;
}

#[async_trait]
pub trait RevocationStorage: Send + Sync {
    async fn append(&self, kernel_scope: &str, entry: RevocationEntry) -> Result<u64>;
    async fn snapshot(&self, kernel_scope: &str) -> Result<acp_types::RevocationsSnapshot>;
}

#[async_trait]
pub trait RegistryStorage: Send + Sync {
    async fn upsert_kernel(&self, record: KernelInventoryRecord) -> Result<()>;
    async fn find_kernel_by_hmac(&self, hmac: &str) -> Result<Option<KernelInventoryRecord>>;
}

#[async_trait]
pub trait Storage: PolicyStorage + AuditStorage + RevocationStorage + RegistryStorage + Send + Sync {}

impl<T: PolicyStorage + AuditStorage + RevocationStorage + RegistryStorage + Send + Sync> Storage for T {}

pub mod memory;
