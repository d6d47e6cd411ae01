//! Per-embedding kernel configuration, written once by the installer and
//! read-only at runtime.

use acp_types::KernelBindings;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailMode {
    Open,
    Closed,
    ReadOpen,
}

impl FailMode {
    pub fn from_env_str(s: &str) -> Self {
        match s {
            "open" => FailMode::Open,
            "read-open" => FailMode::ReadOpen,
            _ => FailMode::Closed,
        }
    }

    /// Whether a request of this read/write kind should proceed on outage.
    pub fn allows_degraded(self, is_mutation: bool) -> bool {
        match self {
            FailMode::Open => true,
            FailMode::Closed => false,
            FailMode::ReadOpen => !is_mutation,
        }
    }
}

/// Wraps the shared [`KernelBindings`] with runtime-only fields that must be
/// read lazily inside the handler, never at module initialisation.
#[derive(Clone, Debug)]
pub struct KernelRuntimeBindings {
    pub bindings: KernelBindings,
    pub integration: String,
    pub enabled: bool,
    pub fail_mode: FailMode,
    pub base_path: String,
    pub endpoint_path: String,
    pub max_body_bytes: usize,
    pub max_params_summary_bytes: usize,
    pub decision_cache_ttl_ms: u64,
}

impl KernelRuntimeBindings {
    /// Fails fast if `integration` is empty — the one required-bindings
    /// invariant the router enforces at construction.
    pub fn validate(&self) -> Result<(), String> {
        if self.integration.trim().is_empty() {
            return Err("bindings.integration must be a non-empty string".to_string());
        }
        Ok(())
    }
}

impl Default for KernelRuntimeBindings {
    fn default() -> Self {
        Self {
            bindings: KernelBindings {
                kernel_id: "kernel_dev".to_string(),
                tenant_id: "tenant_dev".to_string(),
                hub_base_url: "http://localhost:8081".to_string(),
                hub_service_key: String::new(),
                kve_base_url: None,
                kve_service_key: None,
                installed_packs: vec![],
            },
            integration: "acp-dev".to_string(),
            enabled: false,
            fail_mode: FailMode::Closed,
            base_path: "/api".to_string(),
            endpoint_path: "/manage".to_string(),
            max_body_bytes: 8 * 1024,
            max_params_summary_bytes: 4 * 1024,
            decision_cache_ttl_ms: 5_000,
        }
    }
}
