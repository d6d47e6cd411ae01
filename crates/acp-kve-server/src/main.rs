use std::sync::Arc;

use acp_kve::adapters::memory::{
    EchoHandler, InMemoryAllowlist, InMemorySecretStore, InMemoryServiceKeys, InMemoryTenantIntegrations,
};
use acp_kve::Executor;
use acp_kve_server::{router, state};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let pepper = std::env::var("ACP_KVE_PEPPER").unwrap_or_else(|_| "dev-pepper-change-me".to_string());
    let bind_addr = std::env::var("ACP_KVE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8082".to_string());

    let service_keys = Arc::new(InMemoryServiceKeys::new());
    let allowlist = Arc::new(InMemoryAllowlist::new());
    let tenant_integrations = Arc::new(InMemoryTenantIntegrations::new());
    let secrets = Arc::new(InMemorySecretStore::new());

    let mut executor = Executor::new(
        service_keys,
        allowlist,
        tenant_integrations,
        secrets,
        pepper,
    );
    // Real deployments register one handler per integration (Shopify, CIQ, ...);
    // `echo` stands in until those land.
    executor.register_handler(Arc::new(EchoHandler::new("echo")));

    let state = state::AppState::new(Arc::new(executor));
    let app = router::create_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    tracing::info!(addr = %bind_addr, "key-vault executor listening");

    axum::serve(listener, app)
        .await
        .expect("kve server terminated unexpectedly");
}
