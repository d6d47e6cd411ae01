use std::sync::{Arc, OnceLock};

use acp_kernel::adapters::memory::{InMemoryAudit, InMemoryCeilings, InMemoryDb, InMemoryIdempotency, InMemoryRateLimit};
use acp_kernel::adapters::{ControlPlaneAdapter, ExecutorAdapter};
use acp_kernel::{Adapters, ActionRegistry, ActionRegistryBuilder, FailMode, KernelRuntimeBindings, Router};
use acp_kernel::packs;
use acp_kernel_server::{http_adapters, router, state};
use acp_types::KernelBindings;
use tokio::net::TcpListener;

fn build_registry() -> Arc<ActionRegistry> {
    static REGISTRY: OnceLock<Arc<ActionRegistry>> = OnceLock::new();

    // `meta.actions`/`meta.version` list every action in the registry they
    // themselves belong to; they read through this cell rather than the
    // registry being built twice.
    let snapshot: Arc<dyn Fn() -> Vec<acp_types::ActionDescriptor> + Send + Sync> =
        Arc::new(|| REGISTRY.get().map(|r| r.all_descriptors()).unwrap_or_default());
    let total_actions: Arc<dyn Fn() -> usize + Send + Sync> =
        Arc::new(|| REGISTRY.get().map(|r| r.total_actions()).unwrap_or(0));

    let registry = ActionRegistryBuilder::new()
        .add_pack(packs::meta::build(snapshot, total_actions))
        .expect("meta pack registers without name collisions")
        .add_pack(packs::iam::build())
        .expect("iam pack registers without name collisions")
        .add_pack(packs::domain::build())
        .expect("domain pack registers without name collisions")
        .build();

    let registry = Arc::new(registry);
    let _ = REGISTRY.set(registry.clone());
    registry
}

fn load_bindings() -> KernelRuntimeBindings {
    let hub_base_url = std::env::var("ACP_HUB_BASE_URL").unwrap_or_else(|_| "http://localhost:8081".to_string());
    let hub_service_key = std::env::var("ACP_KERNEL_HUB_SERVICE_KEY").unwrap_or_default();
    let kve_base_url = std::env::var("ACP_KVE_BASE_URL").ok();
    let kve_service_key = std::env::var("ACP_KERNEL_KVE_SERVICE_KEY").ok();

    KernelRuntimeBindings {
        bindings: KernelBindings {
            kernel_id: std::env::var("ACP_KERNEL_ID").unwrap_or_else(|_| "kernel_dev".to_string()),
            tenant_id: std::env::var("ACP_TENANT_ID").unwrap_or_else(|_| "tenant_dev".to_string()),
            hub_base_url,
            hub_service_key,
            kve_base_url,
            kve_service_key,
            installed_packs: vec!["meta".to_string(), "iam".to_string(), "domain".to_string()],
        },
        integration: std::env::var("ACP_INTEGRATION").unwrap_or_else(|_| "acp-dev".to_string()),
        enabled: std::env::var("ACP_KERNEL_ENABLED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(true),
        fail_mode: FailMode::from_env_str(&std::env::var("ACP_FAIL_MODE").unwrap_or_else(|_| "closed".to_string())),
        base_path: std::env::var("ACP_BASE_PATH").unwrap_or_else(|_| "/api".to_string()),
        endpoint_path: std::env::var("ACP_ENDPOINT_PATH").unwrap_or_else(|_| "/manage".to_string()),
        ..KernelRuntimeBindings::default()
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let bindings = load_bindings();
    let registry = build_registry();

    let control_plane: Option<Arc<dyn ControlPlaneAdapter>> = if bindings.bindings.hub_service_key.is_empty() {
        None
    } else {
        Some(Arc::new(http_adapters::HttpControlPlane::new(
            bindings.bindings.hub_base_url.clone(),
            bindings.bindings.hub_service_key.clone(),
        )))
    };

    let executor: Arc<dyn ExecutorAdapter> = match (&bindings.bindings.kve_base_url, &bindings.bindings.kve_service_key) {
        (Some(base_url), Some(service_key)) => {
            Arc::new(http_adapters::HttpExecutor::new(base_url.clone(), service_key.clone()))
        }
        _ => Arc::new(acp_kernel::adapters::memory::EchoExecutor),
    };

    let adapters = Adapters {
        db: Arc::new(InMemoryDb::new()),
        audit: Arc::new(InMemoryAudit::new()),
        idempotency: Arc::new(InMemoryIdempotency::new()),
        rate_limit: Arc::new(InMemoryRateLimit::new()),
        ceilings: Arc::new(InMemoryCeilings::new()),
        control_plane,
        executor,
    };

    let manage_path = format!("{}{}", bindings.base_path, bindings.endpoint_path);
    let router = Arc::new(Router::new(registry, adapters, bindings).expect("kernel bindings are valid"));
    let state = state::AppState::new(router);
    let app = router::create_router(state, &manage_path);

    let bind_addr = std::env::var("ACP_KERNEL_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    tracing::info!(addr = %bind_addr, manage_path = %manage_path, "kernel listening");

    axum::serve(listener, app)
        .await
        .expect("kernel server terminated unexpectedly");
}
