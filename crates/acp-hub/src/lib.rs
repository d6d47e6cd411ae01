//! Governance Hub: the authoritative decision service.
//!
//! Composes a [`DecisionEngine`], [`AuditIngest`], [`RevocationService`], and
//! [`RegistryService`] over a single [`storage::Storage`] implementation.
//! The HTTP surface lives in the `acp-hub-server` binary crate; this crate
//! carries no `axum` dependency.

pub mod engine;
pub mod error;
pub mod hmac_auth;
pub mod ingest;
pub mod registry;
pub mod revocations;
pub mod storage;

pub use engine::{AuthorizeRequest, AuthorizeResult, DecisionEngine};
pub use error::{HubError, Result};
pub use ingest::{AuditIngest, IngestOutcome};
pub use registry::{HeartbeatRequest, HeartbeatResponse, RegistryService};
pub use revocations::RevocationService;
pub use storage::{memory::InMemoryStorage, AuditStorage, PolicyStorage, RegistryStorage, RevocationStorage, Storage};

use std::sync::Arc;

/// A fully wired governance hub over one storage backend.
pub struct Hub<S> {
    pub decisions: DecisionEngine<S>,
    pub audit: AuditIngest<S>,
    pub revocations: RevocationService<S>,
    pub registry: RegistryService<S>,
}

impl<S: Storage> Hub<S> {
    pub fn new(storage: Arc<S>, pepper: impl Into<String>, cold_storage_enabled: bool) -> Self {
        Self {
            decisions: DecisionEngine::new(storage.clone()),
            audit: AuditIngest::new(storage.clone(), cold_storage_enabled),
            revocations: RevocationService::new(storage.clone()),
            registry: RegistryService::new(storage, pepper),
        }
    }
}
