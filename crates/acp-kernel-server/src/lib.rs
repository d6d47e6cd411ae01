//! Embedded kernel HTTP server library: the axum router, handlers, and
//! outbound HTTP adapters, split out from the binary so integration tests
//! can drive the router with `tower::ServiceExt::oneshot` instead of a
//! bound socket.

pub mod handlers;
pub mod http_adapters;
pub mod router;
pub mod state;
