//! Revocation appends and snapshot reads.

use std::sync::Arc;

use chrono::Utc;

use acp_types::{RevocationEntry, RevocationsSnapshot, RevokedSubject};

use crate::error::Result;
use crate::storage::RevocationStorage;

pub struct RevocationService<S> {
    storage: Arc<S>,
}

impl<S: RevocationStorage> RevocationService<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Appends a revocation and bumps the version for the affected kernel
    /// scope. `kernel_scope` is the organisation or tenant id the revocation
    /// applies to; kernels poll `snapshot` keyed by the same scope.
    pub async fn revoke(
        &self,
        kernel_scope: &str,
        subject: RevokedSubject,
        reason: Option<String>,
    ) -> Result<u64> {
        let entry = RevocationEntry {
            subject,
            revoked_at: Utc::now(),
            reason,
        };
        self.storage.append(kernel_scope, entry).await
    }

    pub async fn snapshot(&self, kernel_scope: &str) -> Result<RevocationsSnapshot> {
        self.storage.snapshot(kernel_scope).await
    }
}
