//! Bounded, per-process cache of `allow` decisions, keyed by the composite
//! key `(action, actor, tenant, request_hash, policy_version)`.

use dashmap::DashMap;

use acp_types::Decision;

const MAX_ENTRIES: usize = 10_000;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    action: String,
    actor: String,
    tenant: String,
    request_hash: String,
    policy_version: String,
}

struct CacheEntry {
    decision: Decision,
    expires_at_ms: i64,
}

/// Invalidated wholesale whenever a heartbeat response carries a newer
/// `policy_version`.
pub struct DecisionCache {
    entries: DashMap<CacheKey, CacheEntry>,
    last_known_policy_version: std::sync::RwLock<Option<String>>,
}

impl DecisionCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            last_known_policy_version: std::sync::RwLock::new(None),
        }
    }

    pub fn get(
        &self,
        action: &str,
        actor: &str,
        tenant: &str,
        request_hash: &str,
        policy_version: &str,
        now_ms: i64,
    ) -> Option<Decision> {
        let key = CacheKey {
            action: action.to_string(),
            actor: actor.to_string(),
            tenant: tenant.to_string(),
            request_hash: request_hash.to_string(),
            policy_version: policy_version.to_string(),
        };
        let entry = self.entries.get(&key)?;
        if entry.expires_at_ms <= now_ms {
            drop(entry);
            self.entries.remove(&key);
            return None;
        }
        Some(entry.decision.clone())
    }

    pub fn put(
        &self,
        action: &str,
        actor: &str,
        tenant: &str,
        request_hash: &str,
        policy_version: &str,
        decision: Decision,
        ttl_ms: u64,
        now_ms: i64,
    ) {
        if !decision.is_allow() {
            return;
        }
        if self.entries.len() >= MAX_ENTRIES {
            // No ordering metadata kept for true LRU eviction; drop one
            // arbitrary entry rather than grow unbounded.
            if let Some(entry) = self.entries.iter().next().map(|e| e.key().clone()) {
                self.entries.remove(&entry);
            }
        }
        let key = CacheKey {
            action: action.to_string(),
            actor: actor.to_string(),
            tenant: tenant.to_string(),
            request_hash: request_hash.to_string(),
            policy_version: policy_version.to_string(),
        };
        self.entries.insert(
            key,
            CacheEntry {
                decision,
                expires_at_ms: now_ms + ttl_ms as i64,
            },
        );
    }

    /// Drops every entry when the observed `policy_version` changes.
    pub fn observe_policy_version(&self, policy_version: &str) {
        let mut last = self.last_known_policy_version.write().expect("lock poisoned");
        if last.as_deref() != Some(policy_version) {
            self.entries.clear();
            *last = Some(policy_version.to_string());
        }
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new()
    }
}
