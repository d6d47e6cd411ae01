//! Audit ingest: synchronous hot-index write, best-effort cold blob write.

use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

use acp_types::{AuditEvent, AuditPage, AuditQuery};

use crate::error::{HubError, Result};
use crate::storage::AuditStorage;

pub struct AuditIngest<S> {
    storage: Arc<S>,
    cold_storage_enabled: bool,
}

pub struct IngestOutcome {
    pub accepted: usize,
    pub ids: Vec<String>,
}

impl<S: AuditStorage> AuditIngest<S> {
    pub fn new(storage: Arc<S>, cold_storage_enabled: bool) -> Self {
        Self {
            storage,
            cold_storage_enabled,
        }
    }

    /// Accepts a batch of events. A failure on one event never fails the
    /// others; `accepted` counts only the ones that made it into the hot
    /// table.
    pub async fn ingest(&self, events: Vec<AuditEvent>) -> IngestOutcome {
        let mut accepted = Vec::with_capacity(events.len());
        for event in events {
            let event_id = event.event_id.to_string();
            match self.storage.insert_hot(event.clone()).await {
                Ok(true) => {
                    accepted.push(event_id.clone());
                    if self.cold_storage_enabled {
                        if let Err(err) = self.write_cold_blob(&event_id, &event).await {
                            tracing::warn!(event_id = %event_id, error = %err, "cold blob write failed");
                        }
                    }
                }
                Ok(false) => {
                    // Duplicate event_id; idempotent no-op.
                    accepted.push(event_id);
                }
                Err(err) => {
                    tracing::error!(event_id = %event_id, error = %err, "audit hot insert failed");
                }
            }
        }
        IngestOutcome {
            accepted: accepted.len(),
            ids: accepted,
        }
    }

    async fn write_cold_blob(&self, event_id: &str, event: &AuditEvent) -> Result<()> {
        let json = serde_json::to_vec(event).map_err(|e| HubError::InvalidRequest(e.to_string()))?;
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder
            .write_all(&json)
            .map_err(|e| HubError::StorageUnavailable(e.to_string()))?;
        let compressed = encoder
            .finish()
            .map_err(|e| HubError::StorageUnavailable(e.to_string()))?;
        self.storage.insert_cold_blob(event_id, compressed).await
    }

    pub async fn query(&self, query: AuditQuery) -> Result<AuditPage> {
        self.storage.query(query).await
    }
}
