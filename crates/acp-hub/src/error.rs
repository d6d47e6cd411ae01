use acp_types::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("unauthenticated kernel")]
    Unauthenticated,
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl HubError {
    pub fn code(&self) -> ErrorCode {
        match self {
            HubError::PayloadTooLarge => ErrorCode::ValidationError,
            HubError::InvalidRequest(_) => ErrorCode::ValidationError,
            HubError::Unauthenticated => ErrorCode::InvalidApiKey,
            HubError::StorageUnavailable(_) => ErrorCode::GovernanceUnavailable,
            HubError::NotFound(_) => ErrorCode::NotFound,
        }
    }

    /// The transport status to send with this error. `PayloadTooLarge`
    /// serializes as `VALIDATION_ERROR` but rides over HTTP as 413.
    pub fn http_status(&self) -> u16 {
        match self {
            HubError::PayloadTooLarge => 413,
            other => other.code().http_status(),
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
