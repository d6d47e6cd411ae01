use acp_types::ErrorCode;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub ok: bool,
    pub error: String,
    pub code: &'static str,
}

pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    pub http_status: u16,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            http_status: code.http_status(),
            message: message.into(),
        }
    }

    pub fn with_status(code: ErrorCode, message: impl Into<String>, http_status: u16) -> Self {
        Self {
            code,
            http_status,
            message: message.into(),
        }
    }
}

impl From<acp_kve::KveError> for ApiError {
    fn from(err: acp_kve::KveError) -> Self {
        Self {
            code: err.code(),
            http_status: err.http_status(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            ok: false,
            error: self.message,
            code: self.code.as_str(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
