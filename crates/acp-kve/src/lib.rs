//! Key-Vault Executor: turns `{ tenant_id, integration, action, params,
//! request_hash, trace }` into a sanitized call to a third-party API. The
//! HTTP surface lives in `acp-kve-server`.

pub mod adapters;
pub mod error;
pub mod pipeline;

pub use adapters::{
    AllowlistStore, IntegrationHandler, IntegrationOutcome, SecretStore, ServiceKeyStore,
    TenantIntegrationStore,
};
pub use error::{KveError, Result};
pub use pipeline::Executor;
