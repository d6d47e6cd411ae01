use acp_types::ErrorCode;
use thiserror::Error;

/// Internal pipeline error. Every variant maps onto a closed [`ErrorCode`];
/// the router's job is to never let anything else escape stage evaluation.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("feature disabled")]
    FeatureDisabled,
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),
    #[error("invalid api key")]
    InvalidApiKey,
    #[error("unknown action: {0}")]
    UnknownAction(String),
    #[error("action does not support dry_run")]
    DryRunUnsupported,
    #[error("missing required scope: {0}")]
    ScopeDenied(String),
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("ceiling exceeded: {0}")]
    CeilingExceeded(String),
    #[error("invalid params: {0}")]
    ValidationError(String),
    #[error("policy denied: {0}")]
    PolicyDenied(String),
    #[error("governance unavailable")]
    GovernanceUnavailable,
    #[error("internal error: {0}")]
    Internal(String),
}

impl RouterError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RouterError::FeatureDisabled => ErrorCode::FeatureDisabled,
            RouterError::PayloadTooLarge => ErrorCode::ValidationError,
            RouterError::InvalidEnvelope(_) => ErrorCode::ValidationError,
            RouterError::InvalidApiKey => ErrorCode::InvalidApiKey,
            RouterError::UnknownAction(_) => ErrorCode::NotFound,
            RouterError::DryRunUnsupported => ErrorCode::ValidationError,
            RouterError::ScopeDenied(_) => ErrorCode::ScopeDenied,
            RouterError::RateLimited => ErrorCode::RateLimited,
            RouterError::CeilingExceeded(_) => ErrorCode::CeilingExceeded,
            RouterError::ValidationError(_) => ErrorCode::ValidationError,
            RouterError::PolicyDenied(_) => ErrorCode::PolicyDenied,
            RouterError::GovernanceUnavailable => ErrorCode::GovernanceUnavailable,
            RouterError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// The transport status to send with this error. Distinct from
    /// [`Self::code`]'s wire string: `PayloadTooLarge` still serializes as
    /// `VALIDATION_ERROR`, but rides over HTTP as 413, not 400.
    pub fn http_status(&self) -> u16 {
        match self {
            RouterError::PayloadTooLarge => 413,
            other => other.code().http_status(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
