//! Immutable action registry, built once at kernel boot and never mutated
//! after.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use acp_types::ActionDescriptor;

use crate::context::RequestContext;
use crate::error::Result;

/// Impact shape a dry-run handler must return.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Impact {
    #[serde(default)]
    pub creates: Vec<Value>,
    #[serde(default)]
    pub updates: Vec<Value>,
    #[serde(default)]
    pub deletes: Vec<Value>,
    #[serde(default)]
    pub side_effects: Vec<Value>,
    pub risk: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires_approval: Option<bool>,
}

/// A handler's output. `impact` is required when `ctx.dry_run` is true;
/// its absence on a dry-run call is an implementation error.
pub struct HandlerOutput {
    pub data: Value,
    pub impact: Option<Impact>,
}

impl HandlerOutput {
    pub fn data(data: Value) -> Self {
        Self { data, impact: None }
    }

    pub fn with_impact(data: Value, impact: Impact) -> Self {
        Self {
            data,
            impact: Some(impact),
        }
    }
}

#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, ctx: &RequestContext, params: &Value) -> Result<HandlerOutput>;
}

struct Registration {
    descriptor: ActionDescriptor,
    handler: Arc<dyn ActionHandler>,
}

/// A registration bundle of related actions sharing a first dotted segment.
pub struct Pack {
    pub name: String,
    pub actions: Vec<(ActionDescriptor, Arc<dyn ActionHandler>)>,
}

/// Sum type of action descriptors plus a parallel map to handlers, frozen
/// once `build` returns.
pub struct ActionRegistry {
    registrations: HashMap<String, Registration>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate action name: {0}")]
    DuplicateAction(String),
}

pub struct ActionRegistryBuilder {
    registrations: HashMap<String, Registration>,
}

impl ActionRegistryBuilder {
    pub fn new() -> Self {
        Self {
            registrations: HashMap::new(),
        }
    }

    pub fn add_pack(mut self, pack: Pack) -> std::result::Result<Self, RegistryError> {
        for (descriptor, handler) in pack.actions {
            let name = descriptor.name.to_string();
            if self.registrations.contains_key(&name) {
                return Err(RegistryError::DuplicateAction(name));
            }
            self.registrations.insert(name, Registration { descriptor, handler });
        }
        Ok(self)
    }

    pub fn build(self) -> ActionRegistry {
        ActionRegistry {
            registrations: self.registrations,
        }
    }
}

impl Default for ActionRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRegistry {
    pub fn descriptor(&self, action: &str) -> Option<&ActionDescriptor> {
        self.registrations.get(action).map(|r| &r.descriptor)
    }

    pub fn handler(&self, action: &str) -> Option<Arc<dyn ActionHandler>> {
        self.registrations.get(action).map(|r| r.handler.clone())
    }

    pub fn contains(&self, action: &str) -> bool {
        self.registrations.contains_key(action)
    }

    pub fn all_descriptors(&self) -> Vec<ActionDescriptor> {
        let mut items: Vec<_> = self.registrations.values().map(|r| r.descriptor.clone()).collect();
        items.sort_by(|a, b| a.name.0.cmp(&b.name.0));
        items
    }

    pub fn total_actions(&self) -> usize {
        self.registrations.len()
    }
}
