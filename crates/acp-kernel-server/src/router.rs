use axum::routing::{get, post};
use axum::Router as AxumRouter;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// `manage_path` is the embedding host's `base_path` + `endpoint_path`
/// joined at boot.
pub fn create_router(state: AppState, manage_path: &str) -> AxumRouter {
    AxumRouter::new()
        .route("/health", get(handlers::health))
        .route(manage_path, post(handlers::manage))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
