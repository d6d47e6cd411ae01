//! The per-tenant kernel runtime: action registry, adapter interfaces, audit
//! emission, and the request pipeline.

pub mod adapters;
pub mod audit_emitter;
pub mod bindings;
pub mod context;
pub mod decision_cache;
pub mod error;
pub mod packs;
pub mod registry;
pub mod router;
pub mod validate;

pub use bindings::{FailMode, KernelRuntimeBindings};
pub use context::{Adapters, ManageRequest, ManageResponse, RequestContext};
pub use error::{Result, RouterError};
pub use registry::{ActionHandler, ActionRegistry, ActionRegistryBuilder, HandlerOutput, Impact, Pack};
pub use router::Router;
