//! The per-request pipeline: a pure function of adapters plus the action
//! registry. Performs no I/O outside its adapters.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use acp_types::{
    ActorRef, ActorType, AuditStatus, Decision, DecisionSource, ErrorCode, RequestId,
};

use crate::adapters::{AuthorizeRequest, ReplayResponse};
use crate::audit_emitter::{result_meta_from_impact, AuditEmitter, EmitOptions};
use crate::bindings::KernelRuntimeBindings;
use crate::context::{Adapters, ManageRequest, ManageResponse, RequestContext};
use crate::decision_cache::DecisionCache;
use crate::error::RouterError;
use crate::registry::ActionRegistry;
use crate::validate::{project_summary, validate};

const DEFAULT_RATE_LIMIT_PER_MIN: u32 = 60;
const MUTATION_RATE_LIMIT_PER_MIN: u32 = 10;
const IAM_WRITE_RATE_LIMIT_PER_MIN: u32 = 20;
const POLICY_CALL_TIMEOUT_LOCAL: Duration = Duration::from_millis(250);
const POLICY_CALL_TIMEOUT_NETWORK: Duration = Duration::from_millis(750);

pub struct Router {
    registry: Arc<ActionRegistry>,
    adapters: Adapters,
    bindings: KernelRuntimeBindings,
    decision_cache: DecisionCache,
    emitter: AuditEmitter,
}

fn is_mutation(required_scope: &str) -> bool {
    required_scope != "manage.read"
}

fn effective_rate_limit(action: &str, required_scope: &str, default_limit: u32) -> u32 {
    if action.ends_with(".delete") || action.contains("refund") {
        MUTATION_RATE_LIMIT_PER_MIN.min(default_limit)
    } else if action.starts_with("iam.") && is_mutation(required_scope) {
        IAM_WRITE_RATE_LIMIT_PER_MIN.min(default_limit)
    } else {
        default_limit
    }
}

fn hash_key(full_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(full_key.as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

impl Router {
    pub fn new(
        registry: Arc<ActionRegistry>,
        adapters: Adapters,
        bindings: KernelRuntimeBindings,
    ) -> std::result::Result<Self, String> {
        bindings.validate()?;
        let emitter = AuditEmitter::new(adapters.audit.clone());
        Ok(Self {
            registry,
            adapters,
            bindings,
            decision_cache: DecisionCache::new(),
            emitter,
        })
    }

    pub fn decision_cache(&self) -> &DecisionCache {
        &self.decision_cache
    }

    pub async fn handle(
        &self,
        api_key_header: Option<&str>,
        client_ip: Option<String>,
        request: ManageRequest,
    ) -> ManageResponse {
        let request_id = RequestId::new();
        let started_at = chrono::Utc::now();
        let tenant_id = self.bindings.bindings.tenant_id.clone();
        let integration = self.bindings.integration.clone();
        let params = request.params.clone().unwrap_or_else(|| json!({}));
        let no_summary = json!({});

        // Step 1: feature gate. No audit written.
        if !self.bindings.enabled {
            debug!(%request_id, "feature disabled, refusing request");
            return ManageResponse::err(request_id, "the governed action surface is disabled", ErrorCode::FeatureDisabled);
        }

        // Step 2: size gate.
        let body_len = serde_json::to_vec(&request).map(|v| v.len()).unwrap_or(0);
        if body_len > self.bindings.max_body_bytes {
            return self
                .fail(request_id, &tenant_id, &integration, &request, &params, &no_summary, RouterError::PayloadTooLarge, None)
                .await;
        }

        // Step 3: envelope validation.
        if request.action.trim().is_empty() {
            return self
                .fail(
                    request_id,
                    &tenant_id,
                    &integration,
                    &request,
                    &params,
                    &no_summary,
                    RouterError::InvalidEnvelope("action must be a non-empty string".to_string()),
                    None,
                )
                .await;
        }

        // Step 4: authentication.
        let api_key_header = match api_key_header {
            Some(h) if h.len() >= 8 => h,
            _ => {
                return self
                    .fail(request_id, &tenant_id, &integration, &request, &params, &no_summary, RouterError::InvalidApiKey, None)
                    .await
            }
        };
        let prefix: String = api_key_header.chars().take(8).collect();
        let record = match self.adapters.db.find_api_key(&tenant_id, &prefix).await {
            Ok(Some(r)) => r,
            _ => {
                return self
                    .fail(request_id, &tenant_id, &integration, &request, &params, &no_summary, RouterError::InvalidApiKey, None)
                    .await
            }
        };
        if !record.is_active() || record.key_hash != hash_key(api_key_header) {
            return self
                .fail(request_id, &tenant_id, &integration, &request, &params, &no_summary, RouterError::InvalidApiKey, None)
                .await;
        }

        let actor = ActorRef {
            actor_type: ActorType::Agent,
            id: record.prefix.clone(),
            display_name: None,
        };

        // Step 5: action lookup.
        let Some(descriptor) = self.registry.descriptor(&request.action).cloned() else {
            return self
                .fail(
                    request_id,
                    &tenant_id,
                    &integration,
                    &request,
                    &params,
                    &no_summary,
                    RouterError::UnknownAction(request.action.clone()),
                    Some(actor),
                )
                .await;
        };

        // The allowlist-projected subset of `params` that is ever allowed to
        // leave the kernel in an audit event or a hub authorize call.
        let params_summary = project_summary(&params, &descriptor.params_summary_keys);
        let summary_len = serde_json::to_vec(&params_summary).map(|v| v.len()).unwrap_or(0);
        if summary_len > self.bindings.max_params_summary_bytes {
            return self
                .fail(
                    request_id,
                    &tenant_id,
                    &integration,
                    &request,
                    &params,
                    &no_summary,
                    RouterError::PayloadTooLarge,
                    Some(actor),
                )
                .await;
        }

        // Step 6: dry-run gate.
        if request.dry_run && !descriptor.supports_dry_run {
            return self
                .fail(request_id, &tenant_id, &integration, &request, &params, &params_summary, RouterError::DryRunUnsupported, Some(actor))
                .await;
        }

        // Step 7: scope check.
        if !record.has_scope(&descriptor.required_scope) {
            warn!(%request_id, action = %request.action, required_scope = %descriptor.required_scope, "scope denied");
            return self
                .deny(
                    request_id,
                    &tenant_id,
                    &integration,
                    &request,
                    &params,
                    &params_summary,
                    actor,
                    RouterError::ScopeDenied(descriptor.required_scope.clone()),
                )
                .await;
        }

        let ctx = RequestContext {
            request_id,
            tenant_id: tenant_id.clone(),
            api_key_id: record.id.clone(),
            scopes: record.scopes.clone(),
            dry_run: request.dry_run,
            adapters: self.adapters.clone(),
            bindings: self.bindings.clone(),
            started_at,
            client_ip,
        };

        // Step 8: rate limit.
        let limit = effective_rate_limit(&request.action, &descriptor.required_scope, DEFAULT_RATE_LIMIT_PER_MIN);
        match self.adapters.rate_limit.check(&record.id, &request.action, limit).await {
            Ok(status) if !status.allowed => {
                return self
                    .deny(request_id, &tenant_id, &integration, &request, &params, &params_summary, actor, RouterError::RateLimited)
                    .await
            }
            Err(err) => {
                return self
                    .fail(request_id, &tenant_id, &integration, &request, &params, &params_summary, err, Some(actor))
                    .await
            }
            _ => {}
        }

        let mutation = is_mutation(&descriptor.required_scope);

        // Step 9: ceiling (mutations only).
        if mutation {
            if let Err(err) = self.adapters.ceilings.check(&request.action, &params, &tenant_id).await {
                return self
                    .deny(request_id, &tenant_id, &integration, &request, &params, &params_summary, actor, err)
                    .await;
            }
        }

        // Step 10: idempotency replay.
        if !request.dry_run {
            if let Some(key) = &request.idempotency_key {
                if let Ok(Some(cached)) = self
                    .adapters
                    .idempotency
                    .get_replay(&tenant_id, &request.action, key)
                    .await
                {
                    self.emitter
                        .emit(
                            request_id,
                            &tenant_id,
                            &integration,
                            actor,
                            &request.action,
                            &params,
                            &params_summary,
                            AuditStatus::Success,
                            false,
                            EmitOptions {
                                idempotency_key: Some(key.clone()),
                                ..Default::default()
                            },
                        )
                        .await;
                    return ManageResponse::replay(request_id, cached.data);
                }
            }
        }

        // Step 11: parameter schema validation.
        if let Err(err) = validate(&descriptor.params, &params, "params") {
            return self
                .fail(request_id, &tenant_id, &integration, &request, &params, &params_summary, err, Some(actor))
                .await;
        }

        // Step 12: authorisation (writes only, when a policy adapter is configured).
        let mut decision_source = None;
        let mut degraded_reason = None;
        let mut policy_version = None;
        let mut policy_decision_id = None;
        if mutation {
            if let Some(control_plane) = self.adapters.control_plane.clone() {
                let request_hash = acp_types::canonical::request_hash(&tenant_id, &request.action, &params);

                let cached = self.decision_cache.get(
                    &request.action,
                    &actor.id,
                    &tenant_id,
                    &request_hash,
                    "v0",
                    chrono::Utc::now().timestamp_millis(),
                );

                let decision = if let Some(decision) = cached {
                    decision
                } else {
                    let authorize_req = AuthorizeRequest {
                        kernel_id: self.bindings.bindings.kernel_id.clone(),
                        tenant_id: tenant_id.clone(),
                        actor_id: actor.id.clone(),
                        action: request.action.clone(),
                        request_hash: request_hash.clone(),
                        params_summary: params_summary.clone(),
                    };
                    match tokio::time::timeout(POLICY_CALL_TIMEOUT_NETWORK, control_plane.authorize(authorize_req)).await {
                        Ok(Ok(decision)) => {
                            self.decision_cache.put(
                                &request.action,
                                &actor.id,
                                &tenant_id,
                                &request_hash,
                                decision.policy_version(),
                                decision.clone(),
                                self.bindings.decision_cache_ttl_ms,
                                chrono::Utc::now().timestamp_millis(),
                            );
                            decision
                        }
                        Ok(Err(_)) | Err(_) => {
                            if self.bindings.fail_mode.allows_degraded(mutation) {
                                decision_source = Some(DecisionSource::KernelDegraded);
                                degraded_reason = Some("platform_unreachable".to_string());
                                Decision::Allow {
                                    decision_id: acp_types::DecisionId::new(),
                                    matched_policy: None,
                                    policy_version: "degraded".to_string(),
                                }
                            } else {
                                return self
                                    .fail(
                                        request_id,
                                        &tenant_id,
                                        &integration,
                                        &request,
                                        &params,
                                        &params_summary,
                                        RouterError::GovernanceUnavailable,
                                        Some(actor),
                                    )
                                    .await;
                            }
                        }
                    }
                };

                policy_version = Some(decision.policy_version().to_string());
                policy_decision_id = Some(decision.decision_id());
                if decision_source.is_none() {
                    decision_source = Some(DecisionSource::Hub);
                }

                if !decision.is_allow() {
                    let reason = match &decision {
                        Decision::Deny { reason, .. } => reason.clone(),
                        Decision::RequireApproval { .. } => "requires human approval".to_string(),
                        Decision::Allow { .. } => unreachable!(),
                    };
                    return self
                        .deny(request_id, &tenant_id, &integration, &request, &params, &params_summary, actor, RouterError::PolicyDenied(reason))
                        .await;
                }
            }
        }

        // Step 13: handler invocation.
        let Some(handler) = self.registry.handler(&request.action) else {
            return self
                .fail(
                    request_id,
                    &tenant_id,
                    &integration,
                    &request,
                    &params,
                    &params_summary,
                    RouterError::UnknownAction(request.action.clone()),
                    Some(actor),
                )
                .await;
        };

        let outcome = handler.handle(&ctx, &params).await;
        let output = match outcome {
            Ok(output) => output,
            Err(err) => {
                return self
                    .fail(request_id, &tenant_id, &integration, &request, &params, &params_summary, err, Some(actor))
                    .await;
            }
        };

        if request.dry_run && output.impact.is_none() {
            return self
                .fail(
                    request_id,
                    &tenant_id,
                    &integration,
                    &request,
                    &params,
                    &params_summary,
                    RouterError::Internal("dry-run handler did not return an impact".to_string()),
                    Some(actor),
                )
                .await;
        }

        // Step 14: audit emission.
        let result_meta = output.impact.as_ref().map(result_meta_from_impact);
        self.emitter
            .emit(
                request_id,
                &tenant_id,
                &integration,
                actor.clone(),
                &request.action,
                &params,
                &params_summary,
                AuditStatus::Success,
                request.dry_run,
                EmitOptions {
                    policy_decision_id,
                    policy_version: policy_version.clone(),
                    decision_source,
                    degraded_reason,
                    idempotency_key: request.idempotency_key.clone(),
                    result_meta,
                    ..Default::default()
                },
            )
            .await;

        let response_data = if request.dry_run {
            serde_json::to_value(output.impact).unwrap_or(Value::Null)
        } else {
            output.data.clone()
        };

        // Step 15: idempotency store.
        if !request.dry_run {
            if let Some(key) = &request.idempotency_key {
                let _ = self
                    .adapters
                    .idempotency
                    .store_replay(&tenant_id, &request.action, key, ReplayResponse::new(output.data.clone()))
                    .await;
            }
        }

        info!(%request_id, action = %request.action, "request completed");
        ManageResponse::ok(request_id, response_data, request.dry_run, vec![])
    }

    #[allow(clippy::too_many_arguments)]
    async fn fail(
        &self,
        request_id: RequestId,
        tenant_id: &str,
        integration: &str,
        request: &ManageRequest,
        params: &Value,
        params_summary: &Value,
        err: RouterError,
        actor: Option<ActorRef>,
    ) -> ManageResponse {
        let actor = actor.unwrap_or(ActorRef {
            actor_type: ActorType::Agent,
            id: "unknown".to_string(),
            display_name: None,
        });
        let code = err.code();
        self.emitter
            .emit(
                request_id,
                tenant_id,
                integration,
                actor,
                &request.action,
                params,
                params_summary,
                AuditStatus::Error,
                request.dry_run,
                EmitOptions {
                    error_code: Some(code.as_str().to_string()),
                    error_message: Some(err.to_string()),
                    ..Default::default()
                },
            )
            .await;
        ManageResponse::err_with_status(request_id, err.to_string(), code, err.http_status())
    }

    #[allow(clippy::too_many_arguments)]
    async fn deny(
        &self,
        request_id: RequestId,
        tenant_id: &str,
        integration: &str,
        request: &ManageRequest,
        params: &Value,
        params_summary: &Value,
        actor: ActorRef,
        err: RouterError,
    ) -> ManageResponse {
        let code = err.code();
        self.emitter
            .emit(
                request_id,
                tenant_id,
                integration,
                actor,
                &request.action,
                params,
                params_summary,
                AuditStatus::Denied,
                request.dry_run,
                EmitOptions {
                    error_code: Some(code.as_str().to_string()),
                    error_message: Some(err.to_string()),
                    ..Default::default()
                },
            )
            .await;
        ManageResponse::err_with_status(request_id, err.to_string(), code, err.http_status())
    }
}
