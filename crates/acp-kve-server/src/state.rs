use std::sync::Arc;

use acp_kve::adapters::memory::{InMemoryAllowlist, InMemorySecretStore, InMemoryServiceKeys, InMemoryTenantIntegrations};
use acp_kve::Executor;

pub type SharedExecutor = Executor<InMemoryServiceKeys, InMemoryAllowlist, InMemoryTenantIntegrations, InMemorySecretStore>;

#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<SharedExecutor>,
}

impl AppState {
    pub fn new(executor: Arc<SharedExecutor>) -> Self {
        Self { executor }
    }
}
