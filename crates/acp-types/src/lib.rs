//! Shared data model for the kernel, governance hub, and key-vault executor.
//!
//! This crate has no framework dependencies (no `axum`, no `tokio`): every
//! other crate in the workspace depends on it, so it stays a plain data
//! layer that any of them can embed without pulling in the others' runtime.

pub mod action;
pub mod api_key;
pub mod audit;
pub mod bindings;
pub mod canonical;
pub mod decision;
pub mod error;
pub mod error_code;
pub mod hmac_auth;
pub mod ids;
pub mod kve;
pub mod policy;
pub mod revocation;

pub use action::{ActionDescriptor, ActionName, ParamSchema};
pub use canonical::redact_error_message;
pub use api_key::{ApiKeyRecord, ApiKeyStatus};
pub use audit::{
    ActorRef, ActorType, AuditEvent, AuditPage, AuditQuery, AuditStatus, DecisionSource, ResultMeta,
    AUDIT_EVENT_VERSION, AUDIT_SCHEMA_VERSION,
};
pub use bindings::{InstallManifest, KernelBindings, ManagedApiKey};
pub use decision::{ApprovalRecord, ApprovalStatus, Decision, DecisionToken};
pub use error::{Result, TypesError};
pub use error_code::ErrorCode;
pub use hmac_auth::hash_api_key;
pub use ids::{ApprovalId, DecisionId, EventId, PolicyId, RequestId};
pub use kve::{
    ActionAllowlistEntry, ExecuteRequest, ExecuteResponse, ExecuteStatus, ServiceKeyRecord,
    TenantIntegration, UpstreamMeta,
};
pub use policy::{AmountCeiling, Policy, PolicyCondition, PolicyEffect, TimeWindow};
pub use revocation::{
    KernelInventoryRecord, KernelStatus, RevocationEntry, RevocationsSnapshot, RevokedSubject,
};
