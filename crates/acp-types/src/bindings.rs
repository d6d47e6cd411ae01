//! Install-time bindings between a tenant's kernel and the hub/executor.

use serde::{Deserialize, Serialize};

/// Loaded once at kernel boot from its install manifest; tells the kernel
/// which hub and executor endpoints to call and under what identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KernelBindings {
    pub kernel_id: String,
    pub tenant_id: String,
    pub hub_base_url: String,
    pub hub_service_key: String,
    pub kve_base_url: Option<String>,
    pub kve_service_key: Option<String>,
    pub installed_packs: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InstallManifest {
    pub kernel_id: String,
    pub tenant_id: String,
    pub bindings: KernelBindings,
    pub api_keys: Vec<ManagedApiKey>,
}

/// An API key the kernel accepts on `/manage` requests, stored hashed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManagedApiKey {
    pub key_id: String,
    pub key_hash: String,
    pub scopes: Vec<String>,
    pub actor_id: String,
}
