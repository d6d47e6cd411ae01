//! The only sanctioned path for writing audit events.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use acp_types::canonical::request_hash;
use acp_types::{
    redact_error_message, ActionName, ActorRef, ActorType, AuditEvent, AuditStatus, DecisionId,
    DecisionSource, EventId, RequestId, ResultMeta, AUDIT_EVENT_VERSION, AUDIT_SCHEMA_VERSION,
};

use crate::adapters::AuditAdapter;
use crate::registry::Impact;

pub struct EmitOptions {
    pub policy_decision_id: Option<DecisionId>,
    pub policy_version: Option<String>,
    pub decision_source: Option<DecisionSource>,
    pub degraded_reason: Option<String>,
    pub idempotency_key: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub result_meta: Option<ResultMeta>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            policy_decision_id: None,
            policy_version: None,
            decision_source: None,
            degraded_reason: None,
            idempotency_key: None,
            error_code: None,
            error_message: None,
            result_meta: None,
        }
    }
}

pub struct AuditEmitter {
    adapter: Arc<dyn AuditAdapter>,
}

impl AuditEmitter {
    pub fn new(adapter: Arc<dyn AuditAdapter>) -> Self {
        Self { adapter }
    }

    /// Builds and emits the event. `params` is the full, unprojected request
    /// body — used only to compute `request_hash` — while `params_summary`
    /// must already be the allowlist-projected subset the caller intends to
    /// persist; the emitter never widens it. Failures are caught, logged to
    /// stderr via `tracing`, and never propagate — the caller's response
    /// path must never be broken by an audit problem.
    #[allow(clippy::too_many_arguments)]
    pub async fn emit(
        &self,
        request_id: RequestId,
        tenant_id: &str,
        integration: &str,
        actor: ActorRef,
        action: &str,
        params: &Value,
        params_summary: &Value,
        status: AuditStatus,
        dry_run: bool,
        opts: EmitOptions,
    ) {
        let action_name = ActionName::new(action);
        let event = AuditEvent {
            event_id: EventId::new(),
            event_version: AUDIT_EVENT_VERSION,
            schema_version: AUDIT_SCHEMA_VERSION,
            request_id,
            tenant_id: tenant_id.to_string(),
            integration: integration.to_string(),
            pack: action_name.pack().to_string(),
            actor,
            action: action_name,
            status,
            params_summary: params_summary.clone(),
            request_hash: request_hash(tenant_id, action, params),
            policy_decision_id: opts.policy_decision_id,
            policy_version: opts.policy_version,
            decision_source: opts.decision_source,
            degraded_reason: opts.degraded_reason,
            dry_run,
            idempotency_key: opts.idempotency_key,
            error_code: opts.error_code,
            error_message_redacted: opts.error_message.as_deref().map(redact_error_message),
            latency_ms: None,
            result: opts.result_meta,
            occurred_at: Utc::now(),
        };

        let event_id = event.event_id;
        let action_name = event.action.clone();
        if let Err(err) = self.adapter.log_event(event).await {
            tracing::error!(
                event_id = %event_id,
                action = %action_name,
                tenant_id = %tenant_id,
                integration = %integration,
                error = %err,
                "audit adapter failed, dropping event"
            );
        }
    }
}

pub fn result_meta_from_impact(impact: &Impact) -> ResultMeta {
    let resource_type = impact
        .creates
        .first()
        .or_else(|| impact.updates.first())
        .and_then(|v| v.get("type"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let resource_id = impact
        .updates
        .first()
        .and_then(|v| v.get("id"))
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    let count = if !impact.creates.is_empty() {
        Some(impact.creates.len() as u64)
    } else if !impact.deletes.is_empty() {
        Some(impact.deletes.len() as u64)
    } else {
        None
    };
    let ids_created = impact
        .creates
        .iter()
        .filter_map(|v| v.get("id").and_then(|v| v.as_str()).map(|s| s.to_string()))
        .collect();

    ResultMeta {
        resource_type,
        resource_id,
        count,
        ids_created,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_meta_derives_count_from_creates() {
        let impact = Impact {
            creates: vec![serde_json::json!({"id": "p1"}), serde_json::json!({"id": "p2"})],
            ..Default::default()
        };
        let meta = result_meta_from_impact(&impact);
        assert_eq!(meta.count, Some(2));
        assert_eq!(meta.ids_created, vec!["p1", "p2"]);
    }
}
