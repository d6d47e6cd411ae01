//! Illustrative domain packs: `domain.publishers.*` (reads and a mutation
//! for exercising degraded-mode handling) and `domain.leadscoring.models.*`
//! (for exercising idempotent replay). Stands in for out-of-scope
//! third-party integrations such as Shopify or CIQ handlers.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{json, Value};

use acp_types::{ActionDescriptor, ActionName, ParamSchema};

use crate::context::RequestContext;
use crate::error::{Result, RouterError};
use crate::registry::{ActionHandler, HandlerOutput, Impact, Pack};

#[derive(Default)]
struct PublisherStore {
    rows: DashMap<String, Value>,
}

struct PublishersListHandler {
    store: Arc<PublisherStore>,
}

#[async_trait]
impl ActionHandler for PublishersListHandler {
    async fn handle(&self, _ctx: &RequestContext, _params: &Value) -> Result<HandlerOutput> {
        let items: Vec<Value> = self.store.rows.iter().map(|e| e.value().clone()).collect();
        Ok(HandlerOutput::data(json!({ "publishers": items })))
    }
}

struct PublishersCreateHandler {
    store: Arc<PublisherStore>,
}

#[async_trait]
impl ActionHandler for PublishersCreateHandler {
    async fn handle(&self, ctx: &RequestContext, params: &Value) -> Result<HandlerOutput> {
        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RouterError::ValidationError("params.name is required".to_string()))?;
        if ctx.dry_run {
            return Ok(HandlerOutput::with_impact(
                json!({}),
                Impact {
                    creates: vec![json!({ "type": "publisher", "count": 1 })],
                    risk: "low".to_string(),
                    ..Default::default()
                },
            ));
        }
        let id = uuid::Uuid::new_v4().to_string();
        let row = json!({ "id": id, "name": name });
        self.store.rows.insert(id.clone(), row.clone());
        Ok(HandlerOutput::with_impact(
            row,
            Impact {
                creates: vec![json!({ "type": "publisher", "id": id })],
                risk: "low".to_string(),
                ..Default::default()
            },
        ))
    }
}

struct PublishersDeleteHandler {
    store: Arc<PublisherStore>,
}

#[async_trait]
impl ActionHandler for PublishersDeleteHandler {
    async fn handle(&self, _ctx: &RequestContext, params: &Value) -> Result<HandlerOutput> {
        let id = params
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RouterError::ValidationError("params.id is required".to_string()))?;
        self.store.rows.remove(id);
        Ok(HandlerOutput::with_impact(
            json!({ "id": id, "deleted": true }),
            Impact {
                deletes: vec![json!({ "type": "publisher", "id": id })],
                risk: "medium".to_string(),
                ..Default::default()
            },
        ))
    }
}

#[derive(Default)]
struct ModelStore {
    rows: DashMap<String, Value>,
}

struct ModelsListHandler {
    store: Arc<ModelStore>,
}

#[async_trait]
impl ActionHandler for ModelsListHandler {
    async fn handle(&self, _ctx: &RequestContext, _params: &Value) -> Result<HandlerOutput> {
        let items: Vec<Value> = self.store.rows.iter().map(|e| e.value().clone()).collect();
        Ok(HandlerOutput::data(json!({ "models": items })))
    }
}

struct ModelsCreateHandler {
    store: Arc<ModelStore>,
}

#[async_trait]
impl ActionHandler for ModelsCreateHandler {
    async fn handle(&self, ctx: &RequestContext, params: &Value) -> Result<HandlerOutput> {
        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RouterError::ValidationError("params.name is required".to_string()))?;
        if ctx.dry_run {
            return Ok(HandlerOutput::with_impact(
                json!({}),
                Impact {
                    creates: vec![json!({ "type": "leadscoring_model", "count": 1 })],
                    risk: "low".to_string(),
                    ..Default::default()
                },
            ));
        }
        let id = uuid::Uuid::new_v4().to_string();
        let row = json!({ "id": id, "name": name });
        self.store.rows.insert(id.clone(), row.clone());
        Ok(HandlerOutput::with_impact(
            row,
            Impact {
                creates: vec![json!({ "type": "leadscoring_model", "id": id })],
                risk: "low".to_string(),
                ..Default::default()
            },
        ))
    }
}

pub fn build() -> Pack {
    let publishers = Arc::new(PublisherStore::default());
    let models = Arc::new(ModelStore::default());

    Pack {
        name: "domain".to_string(),
        actions: vec![
            (
                ActionDescriptor {
                    name: ActionName::new("domain.publishers.list"),
                    required_scope: "manage.read".to_string(),
                    description: "List publishers for the calling tenant.".to_string(),
                    params: ParamSchema::object([], &[]),
                    supports_dry_run: false,
                    params_summary_keys: vec![],
                },
                Arc::new(PublishersListHandler {
                    store: publishers.clone(),
                }) as Arc<dyn ActionHandler>,
            ),
            (
                ActionDescriptor {
                    name: ActionName::new("domain.publishers.create"),
                    required_scope: "manage.write".to_string(),
                    description: "Create a publisher.".to_string(),
                    params: ParamSchema::object([("name".to_string(), ParamSchema::string())], &["name"]),
                    supports_dry_run: true,
                    params_summary_keys: vec!["name".to_string()],
                },
                Arc::new(PublishersCreateHandler {
                    store: publishers.clone(),
                }) as Arc<dyn ActionHandler>,
            ),
            (
                ActionDescriptor {
                    name: ActionName::new("domain.publishers.delete"),
                    required_scope: "manage.write".to_string(),
                    description: "Delete a publisher.".to_string(),
                    params: ParamSchema::object([("id".to_string(), ParamSchema::string())], &["id"]),
                    supports_dry_run: false,
                    params_summary_keys: vec!["id".to_string()],
                },
                Arc::new(PublishersDeleteHandler { store: publishers }) as Arc<dyn ActionHandler>,
            ),
            (
                ActionDescriptor {
                    name: ActionName::new("domain.leadscoring.models.list"),
                    required_scope: "manage.read".to_string(),
                    description: "List lead-scoring models.".to_string(),
                    params: ParamSchema::object([], &[]),
                    supports_dry_run: false,
                    params_summary_keys: vec![],
                },
                Arc::new(ModelsListHandler { store: models.clone() }) as Arc<dyn ActionHandler>,
            ),
            (
                ActionDescriptor {
                    name: ActionName::new("domain.leadscoring.models.create"),
                    required_scope: "manage.write".to_string(),
                    description: "Create a lead-scoring model.".to_string(),
                    params: ParamSchema::object([("name".to_string(), ParamSchema::string())], &["name"]),
                    supports_dry_run: true,
                    params_summary_keys: vec!["name".to_string()],
                },
                Arc::new(ModelsCreateHandler { store: models }) as Arc<dyn ActionHandler>,
            ),
        ],
    }
}
