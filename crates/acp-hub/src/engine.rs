//! Decision engine: priority-ordered policy evaluation with an in-process,
//! single-flight-refreshed cache.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

use acp_types::{
    ApprovalId, ApprovalRecord, ApprovalStatus, DecisionId, Policy, PolicyCondition, PolicyEffect,
};

use crate::error::{HubError, Result};
use crate::storage::PolicyStorage;

const CACHE_TTL: Duration = Duration::from_secs(5);

#[derive(Clone)]
struct CachedPolicySet {
    policies: Vec<Policy>,
    policy_version: String,
    loaded_at: Instant,
}

/// What the decision engine is asked to authorize. `is_mutation` is supplied by the caller (the kernel knows its own
/// scope-to-action mapping; the hub does not re-derive it).
#[derive(Clone, Debug)]
pub struct AuthorizeRequest {
    pub organisation_id: String,
    pub kernel_id: String,
    pub tenant_id: String,
    pub actor_type: String,
    pub action: String,
    pub request_hash: String,
    pub params_summary: Value,
    pub is_mutation: bool,
}

pub struct AuthorizeResult {
    pub decision: acp_types::Decision,
    pub reason: Option<String>,
    pub matched_policy_name: Option<String>,
    pub decision_ttl_ms: u64,
}

/// Read-mostly per-`(organisation_id, kernel_id)` policy cache, refreshed at
/// most once per TTL window with single-flight protection against a
/// thundering herd of concurrent misses.
pub struct DecisionEngine<S> {
    storage: Arc<S>,
    cache: DashMap<String, CachedPolicySet>,
    refresh_locks: DashMap<String, Arc<AsyncMutex<()>>>,
    approvals: DashMap<ApprovalId, ApprovalRecord>,
    default_decision_ttl_ms: u64,
}

impl<S: PolicyStorage> DecisionEngine<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self {
            storage,
            cache: DashMap::new(),
            refresh_locks: DashMap::new(),
            approvals: DashMap::new(),
            default_decision_ttl_ms: 5_000,
        }
    }

    fn cache_key(organisation_id: &str, kernel_id: &str) -> String {
        format!("{organisation_id}:{kernel_id}")
    }

    /// Loads the policy set for `(organisation_id, kernel_id)`, serving from
    /// cache when fresh. A stale or absent entry triggers exactly one
    /// storage read across concurrent callers for that key.
    async fn load_policy_set(
        &self,
        organisation_id: &str,
        kernel_id: &str,
    ) -> Result<CachedPolicySet> {
        let key = Self::cache_key(organisation_id, kernel_id);
        if let Some(entry) = self.cache.get(&key) {
            if entry.loaded_at.elapsed() < CACHE_TTL {
                return Ok(entry.clone());
            }
        }

        let lock = self
            .refresh_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        // Someone else may have refreshed while we waited for the lock.
        if let Some(entry) = self.cache.get(&key) {
            if entry.loaded_at.elapsed() < CACHE_TTL {
                return Ok(entry.clone());
            }
        }

        let mut policies = self
            .storage
            .list_policies(organisation_id)
            .await
            .map_err(|e| HubError::StorageUnavailable(e.to_string()))?;
        policies.retain(|p| p.enabled);
        policies.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.to_string().cmp(&b.id.to_string())));
        let policy_version = policy_version_hash(&policies);

        let loaded = CachedPolicySet {
            policies,
            policy_version,
            loaded_at: Instant::now(),
        };
        self.cache.insert(key, loaded.clone());
        Ok(loaded)
    }

    /// Evaluates a single authorize request.
    pub async fn authorize(&self, req: AuthorizeRequest) -> Result<AuthorizeResult> {
        let loaded = self
            .load_policy_set(&req.organisation_id, &req.kernel_id)
            .await?;

        let now = Utc::now();
        let matched = loaded
            .policies
            .iter()
            .find(|p| policy_matches(p, &req, now));

        let decision_id = DecisionId::new();
        let result = match matched {
            Some(policy) => match policy.effect {
                PolicyEffect::Allow => AuthorizeResult {
                    decision: acp_types::Decision::Allow {
                        decision_id,
                        matched_policy: Some(policy.id.clone()),
                        policy_version: loaded.policy_version.clone(),
                    },
                    reason: None,
                    matched_policy_name: Some(policy.name.clone()),
                    decision_ttl_ms: self.default_decision_ttl_ms,
                },
                PolicyEffect::Deny => AuthorizeResult {
                    decision: acp_types::Decision::Deny {
                        decision_id,
                        matched_policy: Some(policy.id.clone()),
                        reason: format!("denied by policy '{}'", policy.name),
                        policy_version: loaded.policy_version.clone(),
                    },
                    reason: Some(format!("denied by policy '{}'", policy.name)),
                    matched_policy_name: Some(policy.name.clone()),
                    decision_ttl_ms: 0,
                },
                PolicyEffect::RequireApproval => {
                    let approval_id = ApprovalId::new();
                    self.approvals.insert(
                        approval_id.clone(),
                        ApprovalRecord {
                            approval_id: approval_id.clone(),
                            decision_id,
                            tenant_id: req.tenant_id.clone(),
                            status: ApprovalStatus::Pending,
                            created_at: now,
                            resolved_at: None,
                            resolved_by: None,
                        },
                    );
                    AuthorizeResult {
                        decision: acp_types::Decision::RequireApproval {
                            decision_id,
                            approval_id,
                            matched_policy: Some(policy.id.clone()),
                            policy_version: loaded.policy_version.clone(),
                        },
                        reason: None,
                        matched_policy_name: Some(policy.name.clone()),
                        decision_ttl_ms: 0,
                    }
                }
            },
            None => {
                // Organisation default: default-deny for writes, default-allow
                // for reads.
                if req.is_mutation {
                    AuthorizeResult {
                        decision: acp_types::Decision::Deny {
                            decision_id,
                            matched_policy: None,
                            reason: "no matching policy; default-deny for writes".to_string(),
                            policy_version: loaded.policy_version.clone(),
                        },
                        reason: Some("no matching policy; default-deny for writes".to_string()),
                        matched_policy_name: None,
                        decision_ttl_ms: 0,
                    }
                } else {
                    AuthorizeResult {
                        decision: acp_types::Decision::Allow {
                            decision_id,
                            matched_policy: None,
                            policy_version: loaded.policy_version.clone(),
                        },
                        reason: None,
                        matched_policy_name: None,
                        decision_ttl_ms: self.default_decision_ttl_ms,
                    }
                }
            }
        };
        Ok(result)
    }

    pub fn current_policy_version(&self, organisation_id: &str, kernel_id: &str) -> Option<String> {
        self.cache
            .get(&Self::cache_key(organisation_id, kernel_id))
            .map(|e| e.policy_version.clone())
    }
}

fn policy_version_hash(policies: &[Policy]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    for p in policies {
        hasher.update(p.id.to_string().as_bytes());
        hasher.update(p.version.as_bytes());
    }
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// A policy matches when it is scoped to the request's kernel and tenant
/// (a `None` scope is a wildcard) and every one of its conditions is
/// satisfied. An empty condition list never matches — author `Always`
/// explicitly.
fn policy_matches(policy: &Policy, req: &AuthorizeRequest, now: chrono::DateTime<Utc>) -> bool {
    if let Some(kernel_id) = &policy.kernel_id {
        if kernel_id != &req.kernel_id {
            return false;
        }
    }
    if let Some(tenant_id) = &policy.tenant_id {
        if tenant_id != &req.tenant_id {
            return false;
        }
    }
    if policy.conditions.is_empty() {
        return false;
    }
    policy
        .conditions
        .iter()
        .all(|c| condition_matches(c, req, now))
}

/// Parses an IANA timezone name, falling back to UTC on failure.
fn parse_tz(tz: &str) -> chrono_tz::Tz {
    tz.parse::<chrono_tz::Tz>().unwrap_or(chrono_tz::UTC)
}

fn condition_matches(condition: &PolicyCondition, req: &AuthorizeRequest, now: chrono::DateTime<Utc>) -> bool {
    match condition {
        PolicyCondition::Always => true,
        PolicyCondition::ActionMatches { pattern } => action_glob_matches(pattern, &req.action),
        PolicyCondition::ActorTypeIs { actor_type } => actor_type.eq_ignore_ascii_case(&req.actor_type),
        PolicyCondition::TenantMatches { tenant_id } => tenant_id == &req.tenant_id,
        PolicyCondition::WithinTimeWindow { window } => {
            use chrono::{Datelike, Timelike};
            let local = now.with_timezone(&parse_tz(&window.timezone));
            let minute_of_day = local.hour() as u16 * 60 + local.minute() as u16;
            let in_range = minute_of_day >= window.start_minute && minute_of_day < window.end_minute;
            let day_ok = window.days_of_week.is_empty()
                || window.days_of_week.contains(&(local.weekday().number_from_monday() as u8 - 1));
            in_range && day_ok
        }
        PolicyCondition::CeilingExceeded { ceiling } => {
            // Absence of the field means the condition does not match
            //.
            req.params_summary
                .get(field_leaf(&ceiling.param_path))
                .and_then(|v| v.as_f64())
                .map(|amount| {
                    ceiling
                        .max_per_call
                        .map(|max| amount > max)
                        .unwrap_or(false)
                })
                .unwrap_or(false)
        }
    }
}

fn field_leaf(param_path: &str) -> &str {
    param_path.rsplit('.').next().unwrap_or(param_path)
}

/// Supports a single trailing or leading segment glob (`payments.*`, `*.refund`),
/// matching the kernel's action-name convention.
fn action_glob_matches(pattern: &str, action: &str) -> bool {
    if pattern == "*" {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix(".*") {
        return action == prefix || action.starts_with(&format!("{prefix}."));
    }
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return action.ends_with(&format!(".{suffix}"));
    }
    pattern == action
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryStorage;
    use acp_types::{AmountCeiling, PolicyId};
    use uuid::Uuid;

    fn policy(name: &str, priority: i32, conditions: Vec<PolicyCondition>, effect: PolicyEffect) -> Policy {
        Policy {
            id: PolicyId(Uuid::new_v4().to_string()),
            organisation_id: "org1".to_string(),
            kernel_id: None,
            tenant_id: Some("t1".to_string()),
            name: name.to_string(),
            priority,
            enabled: true,
            conditions,
            effect,
            reason: None,
            version: "v1".to_string(),
        }
    }

    fn req(action: &str, is_mutation: bool, params: Value) -> AuthorizeRequest {
        AuthorizeRequest {
            organisation_id: "org1".to_string(),
            kernel_id: "kernel1".to_string(),
            tenant_id: "t1".to_string(),
            actor_type: "agent".to_string(),
            action: action.to_string(),
            request_hash: "abc".to_string(),
            params_summary: params,
            is_mutation,
        }
    }

    #[tokio::test]
    async fn default_deny_for_writes_without_policy() {
        let storage = Arc::new(InMemoryStorage::new());
        let engine = DecisionEngine::new(storage);
        let result = engine
            .authorize(req("payments.refund", true, serde_json::json!({})))
            .await
            .unwrap();
        assert!(!result.decision.is_allow());
    }

    #[tokio::test]
    async fn default_allow_for_reads_without_policy() {
        let storage = Arc::new(InMemoryStorage::new());
        let engine = DecisionEngine::new(storage);
        let result = engine
            .authorize(req("payments.list", false, serde_json::json!({})))
            .await
            .unwrap();
        assert!(result.decision.is_allow());
    }

    #[tokio::test]
    async fn glob_action_match_denies() {
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .upsert_policy(policy(
                "deny-all-payments",
                10,
                vec![PolicyCondition::ActionMatches {
                    pattern: "payments.*".to_string(),
                }],
                PolicyEffect::Deny,
            ))
            .await
            .unwrap();
        let engine = DecisionEngine::new(storage);
        let result = engine
            .authorize(req("payments.refund", true, serde_json::json!({})))
            .await
            .unwrap();
        assert!(matches!(result.decision, acp_types::Decision::Deny { .. }));
    }

    #[tokio::test]
    async fn ceiling_condition_absent_field_does_not_match() {
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .upsert_policy(policy(
                "ceiling-deny",
                10,
                vec![
                    PolicyCondition::ActionMatches {
                        pattern: "payments.refund".to_string(),
                    },
                    PolicyCondition::CeilingExceeded {
                        ceiling: AmountCeiling {
                            param_path: "amount".to_string(),
                            max_per_call: Some(1000.0),
                            max_cumulative: None,
                            window_seconds: None,
                        },
                    },
                ],
                PolicyEffect::Deny,
            ))
            .await
            .unwrap();
        let engine = DecisionEngine::new(storage);
        let result = engine
            .authorize(req("payments.refund", true, serde_json::json!({})))
            .await
            .unwrap();
        // No matching policy (ceiling field absent) falls through to the
        // organisation default: default-deny for writes.
        assert!(matches!(result.decision, acp_types::Decision::Deny { .. }));
    }
}
