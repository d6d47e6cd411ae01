use acp_types::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KveError {
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("unauthenticated service key")]
    Unauthenticated,
    #[error("action not allowlisted: {0}/{1}")]
    NotAllowlisted(String, String),
    #[error("tenant not authorized for this service key")]
    TenantNotAuthorized,
    #[error("credential not found for tenant/integration")]
    CredentialNotFound,
    #[error("integration handler error: {0}")]
    HandlerFailed(String),
}

impl KveError {
    pub fn code(&self) -> ErrorCode {
        match self {
            KveError::PayloadTooLarge => ErrorCode::ValidationError,
            KveError::Unauthenticated => ErrorCode::InvalidApiKey,
            KveError::NotAllowlisted(_, _) => ErrorCode::ScopeDenied,
            KveError::TenantNotAuthorized => ErrorCode::ScopeDenied,
            KveError::CredentialNotFound => ErrorCode::NotFound,
            KveError::HandlerFailed(_) => ErrorCode::InternalError,
        }
    }

    /// The transport status to send with this error. `PayloadTooLarge`
    /// serializes as `VALIDATION_ERROR` but rides over HTTP as 413.
    pub fn http_status(&self) -> u16 {
        match self {
            KveError::PayloadTooLarge => 413,
            other => other.code().http_status(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KveError>;
