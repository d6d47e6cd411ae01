use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use acp_types::{AuditEvent, AuditQuery, ErrorCode, RevokedSubject};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 8 * 1024;
const MAX_PARAMS_SUMMARY_BYTES: usize = 4 * 1024;

fn bearer_token(headers: &HeaderMap) -> ApiResult<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::new(ErrorCode::InvalidApiKey, "missing bearer token".to_string()))
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<acp_types::KernelInventoryRecord> {
    let token = bearer_token(headers)?;
    state
        .hub
        .registry
        .lookup(token)
        .await
        .map_err(ApiError::from)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

#[derive(Debug, Deserialize)]
pub struct AuthorizeBody {
    pub tenant_id: String,
    pub actor_type: String,
    pub action: String,
    pub request_hash: String,
    #[serde(default)]
    pub params_summary: Value,
    pub is_mutation: bool,
}

#[derive(Debug, Serialize)]
pub struct AuthorizeResponse {
    pub ok: bool,
    pub decision_id: String,
    pub decision: String,
    pub matched_policy: Option<String>,
    pub reason: Option<String>,
    pub approval_id: Option<String>,
    pub policy_version: String,
    pub decision_ttl_ms: u64,
}

pub async fn authorize(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> ApiResult<Json<AuthorizeResponse>> {
    if body.len() > MAX_BODY_BYTES {
        return Err(ApiError::with_status(ErrorCode::ValidationError, "request body exceeds 8 KB", 413));
    }
    let kernel = authenticate(&state, &headers).await?;
    let req: AuthorizeBody = serde_json::from_slice(&body)
        .map_err(|e| ApiError::new(ErrorCode::ValidationError, format!("invalid request body: {e}")))?;

    let summary_bytes = serde_json::to_vec(&req.params_summary).unwrap_or_default();
    if summary_bytes.len() > MAX_PARAMS_SUMMARY_BYTES {
        return Err(ApiError::with_status(ErrorCode::ValidationError, "params_summary exceeds 4 KB", 413));
    }

    let result = state
        .hub
        .decisions
        .authorize(acp_hub::AuthorizeRequest {
            organisation_id: kernel.organisation_id,
            kernel_id: kernel.kernel_id,
            tenant_id: req.tenant_id,
            actor_type: req.actor_type,
            action: req.action,
            request_hash: req.request_hash,
            params_summary: req.params_summary,
            is_mutation: req.is_mutation,
        })
        .await?;

    let (decision_label, matched_policy, approval_id, policy_version) = match &result.decision {
        acp_types::Decision::Allow {
            matched_policy,
            policy_version,
            ..
        } => ("allow", matched_policy.as_ref().map(|p| p.to_string()), None, policy_version.clone()),
        acp_types::Decision::Deny {
            matched_policy,
            policy_version,
            ..
        } => ("deny", matched_policy.as_ref().map(|p| p.to_string()), None, policy_version.clone()),
        acp_types::Decision::RequireApproval {
            matched_policy,
            approval_id,
            policy_version,
            ..
        } => (
            "require_approval",
            matched_policy.as_ref().map(|p| p.to_string()),
            Some(approval_id.to_string()),
            policy_version.clone(),
        ),
    };

    Ok(Json(AuthorizeResponse {
        ok: true,
        decision_id: result.decision.decision_id().to_string(),
        decision: decision_label.to_string(),
        matched_policy,
        reason: result.reason,
        approval_id,
        policy_version,
        decision_ttl_ms: result.decision_ttl_ms,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IngestBody {
    Single(AuditEvent),
    Batch(Vec<AuditEvent>),
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub ok: bool,
    pub accepted: usize,
    pub ids: Vec<String>,
}

pub async fn audit_ingest(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<IngestBody>,
) -> ApiResult<Json<IngestResponse>> {
    authenticate(&state, &headers).await?;
    let events = match body {
        IngestBody::Single(e) => vec![e],
        IngestBody::Batch(events) => events,
    };
    let outcome = state.hub.audit.ingest(events).await;
    Ok(Json(IngestResponse {
        ok: true,
        accepted: outcome.accepted,
        ids: outcome.ids,
    }))
}

pub async fn audit_query(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AuditQuery>,
) -> ApiResult<Json<acp_types::AuditPage>> {
    authenticate(&state, &headers).await?;
    let page = state.hub.audit.query(query).await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct RevokeBody {
    #[serde(rename = "type")]
    pub subject_type: String,
    pub id: String,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub ok: bool,
    pub revocations_version: u64,
}

pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<RevokeBody>,
) -> ApiResult<Json<RevokeResponse>> {
    let kernel = authenticate(&state, &headers).await?;
    let subject = match body.subject_type.as_str() {
        "key" => RevokedSubject::ApiKey { key_id: body.id },
        "kernel" => RevokedSubject::Kernel { kernel_id: body.id },
        "tenant" => RevokedSubject::Tenant { tenant_id: body.id },
        other => {
            return Err(ApiError::new(
                ErrorCode::ValidationError,
                format!("unknown revocation type '{other}'"),
            ))
        }
    };
    let version = state
        .hub
        .revocations
        .revoke(&kernel.organisation_id, subject, body.reason)
        .await?;
    Ok(Json(RevokeResponse {
        ok: true,
        revocations_version: version,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SnapshotQuery {
    #[serde(rename = "kernelId")]
    pub kernel_id: String,
}

pub async fn revocations_snapshot(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(_query): Query<SnapshotQuery>,
) -> ApiResult<Json<acp_types::RevocationsSnapshot>> {
    let kernel = authenticate(&state, &headers).await?;
    let snapshot = state.hub.revocations.snapshot(&kernel.organisation_id).await?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
pub struct HeartbeatBody {
    #[serde(rename = "kernelId")]
    pub kernel_id: String,
    pub version: String,
    pub packs: Vec<String>,
    pub env: String,
}

#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    pub ok: bool,
    pub kernel_registered: bool,
    pub policy_version: Option<String>,
    pub revocations_version: u64,
}

pub async fn heartbeat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<HeartbeatBody>,
) -> ApiResult<Json<HeartbeatResponse>> {
    let token = bearer_token(&headers)?;
    // The organisation/tenant a new kernel belongs to comes from its install
    // manifest, not the wire body; a production deployment resolves it from
    // the key's provisioning record. For a first heartbeat we key on the
    // kernel id itself (see DESIGN.md).
    let policy_version = state
        .hub
        .decisions
        .current_policy_version(&body.kernel_id, &body.kernel_id);
    let revocations = state.hub.revocations.snapshot(&body.kernel_id).await?;

    let response = state
        .hub
        .registry
        .heartbeat(
            acp_hub::HeartbeatRequest {
                kernel_id: body.kernel_id.clone(),
                organisation_id: body.kernel_id.clone(),
                tenant_id: body.kernel_id,
                presented_api_key: token.to_string(),
                kernel_version: body.version,
                installed_packs: body.packs,
                env: body.env,
            },
            policy_version,
            revocations.version,
        )
        .await?;

    Ok(Json(HeartbeatResponse {
        ok: true,
        kernel_registered: response.kernel_registered,
        policy_version: response.policy_version,
        revocations_version: response.revocations_version,
    }))
}
