//! Governance Hub HTTP server library: the axum router and handlers, split
//! out from the binary so integration tests can drive them with
//! `tower::ServiceExt::oneshot` instead of a bound socket.

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
