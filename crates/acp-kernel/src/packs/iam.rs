//! The built-in `iam` pack: API key lifecycle management.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};

use acp_types::{ActionDescriptor, ActionName, ApiKeyRecord, ApiKeyStatus, ParamSchema};

use crate::context::RequestContext;
use crate::error::{Result, RouterError};
use crate::registry::{ActionHandler, HandlerOutput, Impact, Pack};

const REQUIRED_SCOPE: &str = "manage.iam";

fn generate_key(prefix_len: usize) -> (String, String, String) {
    let full = format!("ak_{}", uuid::Uuid::new_v4().simple());
    let prefix = full.chars().take(prefix_len).collect::<String>();
    let mut hasher = Sha256::new();
    hasher.update(full.as_bytes());
    let hash = hasher.finalize().iter().map(|b| format!("{b:02x}")).collect::<String>();
    (full, prefix, hash)
}

struct CreateHandler;

#[async_trait]
impl ActionHandler for CreateHandler {
    async fn handle(&self, ctx: &RequestContext, params: &Value) -> Result<HandlerOutput> {
        let scopes: Vec<String> = params
            .get("scopes")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|s| s.as_str().map(str::to_string)).collect())
            .unwrap_or_default();
        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("unnamed key")
            .to_string();

        if ctx.dry_run {
            return Ok(HandlerOutput::with_impact(
                json!({}),
                Impact {
                    creates: vec![json!({ "type": "api_key", "count": 1 })],
                    updates: vec![],
                    deletes: vec![],
                    side_effects: vec![],
                    risk: "low".to_string(),
                    warnings: vec![],
                    estimated_cost: None,
                    requires_approval: None,
                },
            ));
        }

        let (full_key, prefix, key_hash) = generate_key(8);
        let record = ApiKeyRecord {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: ctx.tenant_id.clone(),
            prefix: prefix.clone(),
            key_hash,
            name,
            scopes,
            status: ApiKeyStatus::Active,
            created_at: Utc::now(),
            revoked_at: None,
        };
        ctx.adapters.db.insert_api_key(record.clone()).await?;

        Ok(HandlerOutput::with_impact(
            json!({
                "id": record.id,
                "prefix": record.prefix,
                "name": record.name,
                "scopes": record.scopes,
                "key": full_key,
            }),
            Impact {
                creates: vec![json!({ "type": "api_key", "id": record.id })],
                updates: vec![],
                deletes: vec![],
                side_effects: vec![],
                risk: "low".to_string(),
                warnings: vec!["the full key is shown exactly once".to_string()],
                estimated_cost: None,
                requires_approval: None,
            },
        ))
    }
}

struct ListHandler;

#[async_trait]
impl ActionHandler for ListHandler {
    async fn handle(&self, ctx: &RequestContext, _params: &Value) -> Result<HandlerOutput> {
        let keys = ctx.adapters.db.list_api_keys(&ctx.tenant_id).await?;
        let items: Vec<Value> = keys
            .into_iter()
            .map(|k| {
                json!({
                    "id": k.id,
                    "prefix": k.prefix,
                    "name": k.name,
                    "scopes": k.scopes,
                    "status": k.status,
                })
            })
            .collect();
        Ok(HandlerOutput::data(json!({ "keys": items })))
    }
}

struct RevokeHandler;

#[async_trait]
impl ActionHandler for RevokeHandler {
    async fn handle(&self, ctx: &RequestContext, params: &Value) -> Result<HandlerOutput> {
        let key_id = params
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RouterError::ValidationError("params.id is required".to_string()))?;
        let revoked = ctx.adapters.db.revoke_api_key(&ctx.tenant_id, key_id).await?;
        if !revoked {
            return Err(RouterError::ValidationError(format!("unknown key id: {key_id}")));
        }
        Ok(HandlerOutput::data(json!({ "id": key_id, "status": "revoked" })))
    }
}

pub fn build() -> Pack {
    Pack {
        name: "iam".to_string(),
        actions: vec![
            (
                ActionDescriptor {
                    name: ActionName::new("iam.keys.create"),
                    required_scope: REQUIRED_SCOPE.to_string(),
                    description: "Create a new API key for the calling tenant.".to_string(),
                    params: ParamSchema::object(
                        [
                            ("name".to_string(), ParamSchema::string()),
                            ("scopes".to_string(), ParamSchema::array_of(ParamSchema::string())),
                        ],
                        &["scopes"],
                    ),
                    supports_dry_run: true,
                    params_summary_keys: vec!["name".to_string()],
                },
                Arc::new(CreateHandler) as Arc<dyn ActionHandler>,
            ),
            (
                ActionDescriptor {
                    name: ActionName::new("iam.keys.list"),
                    required_scope: "manage.read".to_string(),
                    description: "List API keys for the calling tenant.".to_string(),
                    params: ParamSchema::object([], &[]),
                    supports_dry_run: false,
                    params_summary_keys: vec![],
                },
                Arc::new(ListHandler) as Arc<dyn ActionHandler>,
            ),
            (
                ActionDescriptor {
                    name: ActionName::new("iam.keys.revoke"),
                    required_scope: REQUIRED_SCOPE.to_string(),
                    description: "Revoke an API key by id.".to_string(),
                    params: ParamSchema::object([("id".to_string(), ParamSchema::string())], &["id"]),
                    supports_dry_run: false,
                    params_summary_keys: vec!["id".to_string()],
                },
                Arc::new(RevokeHandler) as Arc<dyn ActionHandler>,
            ),
        ],
    }
}
