//! The built-in `meta` pack: discovery actions every kernel exposes
//! regardless of installed domain packs.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use acp_types::{ActionDescriptor, ActionName, ParamSchema};

use crate::context::RequestContext;
use crate::error::Result;
use crate::registry::{ActionHandler, HandlerOutput, Pack};

const API_VERSION: &str = "1.0";
const SCHEMA_VERSION: u32 = 1;

struct ActionsHandler {
    snapshot: Arc<dyn Fn() -> Vec<ActionDescriptor> + Send + Sync>,
}

#[async_trait]
impl ActionHandler for ActionsHandler {
    async fn handle(&self, _ctx: &RequestContext, _params: &Value) -> Result<HandlerOutput> {
        let actions = (self.snapshot)();
        Ok(HandlerOutput::data(json!({
            "actions": actions,
            "api_version": API_VERSION,
            "total_actions": actions.len(),
        })))
    }
}

struct VersionHandler {
    total_actions: Arc<dyn Fn() -> usize + Send + Sync>,
}

#[async_trait]
impl ActionHandler for VersionHandler {
    async fn handle(&self, _ctx: &RequestContext, _params: &Value) -> Result<HandlerOutput> {
        Ok(HandlerOutput::data(json!({
            "api_version": API_VERSION,
            "schema_version": SCHEMA_VERSION,
            "actions_count": (self.total_actions)(),
        })))
    }
}

struct HealthHandler;

#[async_trait]
impl ActionHandler for HealthHandler {
    async fn handle(&self, ctx: &RequestContext, _params: &Value) -> Result<HandlerOutput> {
        Ok(HandlerOutput::data(json!({
            "status": "ok",
            "tenant_id": ctx.tenant_id,
        })))
    }
}

/// `snapshot`/`total_actions` read from the frozen [`crate::registry::ActionRegistry`]
/// once it exists; callers pass closures over an `Arc<ActionRegistry>` built
/// just before this pack, since the registry can't reference itself.
pub fn build(
    snapshot: Arc<dyn Fn() -> Vec<ActionDescriptor> + Send + Sync>,
    total_actions: Arc<dyn Fn() -> usize + Send + Sync>,
) -> Pack {
    Pack {
        name: "meta".to_string(),
        actions: vec![
            (
                ActionDescriptor {
                    name: ActionName::new("meta.actions"),
                    required_scope: "manage.read".to_string(),
                    description: "List every registered action.".to_string(),
                    params: ParamSchema::object([], &[]),
                    supports_dry_run: false,
                    params_summary_keys: vec![],
                },
                Arc::new(ActionsHandler { snapshot }) as Arc<dyn ActionHandler>,
            ),
            (
                ActionDescriptor {
                    name: ActionName::new("meta.version"),
                    required_scope: "manage.read".to_string(),
                    description: "Report kernel API and schema versions.".to_string(),
                    params: ParamSchema::object([], &[]),
                    supports_dry_run: false,
                    params_summary_keys: vec![],
                },
                Arc::new(VersionHandler { total_actions }) as Arc<dyn ActionHandler>,
            ),
            (
                ActionDescriptor {
                    name: ActionName::new("meta.health"),
                    required_scope: "manage.read".to_string(),
                    description: "Liveness check for the embedding host.".to_string(),
                    params: ParamSchema::object([], &[]),
                    supports_dry_run: false,
                    params_summary_keys: vec![],
                },
                Arc::new(HealthHandler) as Arc<dyn ActionHandler>,
            ),
        ],
    }
}
