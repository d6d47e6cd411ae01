use std::sync::Arc;

use acp_hub::{Hub, InMemoryStorage};
use acp_hub_server::{router, state};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let pepper = std::env::var("ACP_HUB_PEPPER").unwrap_or_else(|_| "dev-pepper-change-me".to_string());
    let cold_storage_enabled = std::env::var("ACP_HUB_COLD_STORAGE")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let bind_addr = std::env::var("ACP_HUB_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_string());

    let storage = Arc::new(InMemoryStorage::new());
    let hub = Arc::new(Hub::new(storage, pepper, cold_storage_enabled));
    let state = state::AppState::new(hub);
    let app = router::create_router(state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    tracing::info!(addr = %bind_addr, "governance hub listening");

    axum::serve(listener, app)
        .await
        .expect("hub server terminated unexpectedly");
}
