//! Policy model evaluated by the hub's decision engine.

use serde::{Deserialize, Serialize};

use crate::ids::PolicyId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyEffect {
    Allow,
    Deny,
    RequireApproval,
}

/// A wall-clock window a policy condition may be scoped to, e.g. business hours.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Minutes since local midnight, inclusive.
    pub start_minute: u16,
    /// Minutes since local midnight, exclusive.
    pub end_minute: u16,
    #[serde(default)]
    pub days_of_week: Vec<u8>,
    /// IANA timezone name (e.g. `"America/New_York"`). Unparseable or empty
    /// values fall back to UTC.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// A cumulative or per-call ceiling on a numeric action parameter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AmountCeiling {
    pub param_path: String,
    pub max_per_call: Option<f64>,
    pub max_cumulative: Option<f64>,
    pub window_seconds: Option<u64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyCondition {
    ActionMatches { pattern: String },
    ActorTypeIs { actor_type: String },
    TenantMatches { tenant_id: String },
    WithinTimeWindow { window: TimeWindow },
    CeilingExceeded { ceiling: AmountCeiling },
    Always,
}

/// A single governance policy. Evaluated in `priority` order;
/// the first matching rule of the highest-priority policy set wins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Policy {
    pub id: PolicyId,
    pub organisation_id: String,
    /// `None` scopes the policy to every kernel in the organisation.
    #[serde(default)]
    pub kernel_id: Option<String>,
    /// `None` scopes the policy to every tenant in the organisation.
    #[serde(default)]
    pub tenant_id: Option<String>,
    pub name: String,
    pub priority: i32,
    pub enabled: bool,
    pub conditions: Vec<PolicyCondition>,
    pub effect: PolicyEffect,
    /// Free-text explanation surfaced on `Deny`/`RequireApproval` decisions.
    #[serde(default)]
    pub reason: Option<String>,
    /// Monotonically increasing per organisation; bumped on every mutation
    /// and used as the decision cache key.
    pub version: String,
}
