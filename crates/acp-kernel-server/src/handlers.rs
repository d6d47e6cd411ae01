use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use acp_kernel::ManageRequest;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').next().unwrap_or(v).trim().to_string())
}

pub async fn manage(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ManageRequest>,
) -> (StatusCode, Json<Value>) {
    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());
    let response = state.router.handle(api_key, client_ip(&headers), request).await;
    let status = StatusCode::from_u16(response.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = serde_json::to_value(&response).unwrap_or(Value::Null);
    (status, Json(body))
}
