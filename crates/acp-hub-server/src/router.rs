use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/authorize", post(handlers::authorize))
        .route("/audit/ingest", post(handlers::audit_ingest))
        .route("/audit/query", get(handlers::audit_query))
        .route("/revoke", post(handlers::revoke))
        .route("/revocations/snapshot", get(handlers::revocations_snapshot))
        .route("/heartbeat", post(handlers::heartbeat))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
