use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use acp_types::{ErrorCode, ExecuteRequest, ExecuteResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

fn bearer_token(headers: &HeaderMap) -> ApiResult<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::new(ErrorCode::InvalidApiKey, "missing bearer token"))
}

pub async fn execute(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> ApiResult<Json<ExecuteResponse>> {
    let service_key = bearer_token(&headers)?;
    let req: ExecuteRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::new(ErrorCode::ValidationError, format!("invalid request body: {e}")))?;
    let response = state.executor.execute(service_key, body.len(), req).await?;
    Ok(Json(response))
}
