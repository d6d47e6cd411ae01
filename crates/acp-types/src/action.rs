//! Action descriptors — the immutable, registration-time contract every
//! privileged operation exposes to the kernel router.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A JSON-Schema subset sufficient for parameter validation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamSchema {
    Object {
        properties: BTreeMap<String, ParamSchema>,
        #[serde(default)]
        required: Vec<String>,
    },
    String {
        #[serde(default)]
        #[serde(rename = "enum")]
        enum_values: Option<Vec<String>>,
    },
    Number {
        #[serde(default)]
        minimum: Option<f64>,
        #[serde(default)]
        maximum: Option<f64>,
    },
    Bool,
    Array {
        items: Box<ParamSchema>,
    },
}

impl ParamSchema {
    pub fn object(properties: impl Into<BTreeMap<String, ParamSchema>>, required: &[&str]) -> Self {
        ParamSchema::Object {
            properties: properties.into(),
            required: required.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn string() -> Self {
        ParamSchema::String { enum_values: None }
    }

    pub fn string_enum(values: &[&str]) -> Self {
        ParamSchema::String {
            enum_values: Some(values.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn array_of(items: ParamSchema) -> Self {
        ParamSchema::Array {
            items: Box::new(items),
        }
    }
}

/// An action's unique dotted name, e.g. `domain.publishers.create`.
///
/// The pack is the first dotted segment; derived, never stored separately.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionName(pub String);

impl ActionName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The first dotted segment, e.g. `domain` for `domain.publishers.create`.
    pub fn pack(&self) -> &str {
        self.0.split('.').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ActionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActionName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Immutable action descriptor, registered once at kernel boot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ActionDescriptor {
    pub name: ActionName,
    pub required_scope: String,
    pub description: String,
    pub params: ParamSchema,
    pub supports_dry_run: bool,
    /// Keys from `params` allowed to flow into the hub's `params_summary`
    /// — never nested bodies.
    pub params_summary_keys: Vec<String>,
}

impl ActionDescriptor {
    pub fn pack(&self) -> &str {
        self.name.pack()
    }
}
