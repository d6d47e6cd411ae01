//! The closed error-code taxonomy and its HTTP status mapping.

use serde::{Deserialize, Serialize};

/// Machine-readable error codes. This set is closed: the pipeline never
/// returns a code outside this enum, and no new variant should be added
/// without updating the HTTP mapping and every caller that matches on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InvalidApiKey,
    ScopeDenied,
    NotFound,
    RateLimited,
    CeilingExceeded,
    IdempotentReplay,
    PolicyDenied,
    FeatureDisabled,
    GovernanceUnavailable,
    InternalError,
}

impl ErrorCode {
    /// Stable HTTP status mapping. Returned as a plain `u16` so
    /// this crate stays independent of any HTTP framework; callers convert.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorCode::ValidationError => 400,
            ErrorCode::InvalidApiKey => 401,
            ErrorCode::ScopeDenied | ErrorCode::PolicyDenied | ErrorCode::CeilingExceeded => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::RateLimited => 429,
            ErrorCode::IdempotentReplay => 200,
            ErrorCode::FeatureDisabled | ErrorCode::GovernanceUnavailable => 503,
            ErrorCode::InternalError => 500,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::InvalidApiKey => "INVALID_API_KEY",
            ErrorCode::ScopeDenied => "SCOPE_DENIED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::CeilingExceeded => "CEILING_EXCEEDED",
            ErrorCode::IdempotentReplay => "IDEMPOTENT_REPLAY",
            ErrorCode::PolicyDenied => "POLICY_DENIED",
            ErrorCode::FeatureDisabled => "FEATURE_DISABLED",
            ErrorCode::GovernanceUnavailable => "GOVERNANCE_UNAVAILABLE",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_spec_table() {
        assert_eq!(ErrorCode::ValidationError.http_status(), 400);
        assert_eq!(ErrorCode::InvalidApiKey.http_status(), 401);
        assert_eq!(ErrorCode::ScopeDenied.http_status(), 403);
        assert_eq!(ErrorCode::PolicyDenied.http_status(), 403);
        assert_eq!(ErrorCode::CeilingExceeded.http_status(), 403);
        assert_eq!(ErrorCode::NotFound.http_status(), 404);
        assert_eq!(ErrorCode::RateLimited.http_status(), 429);
        assert_eq!(ErrorCode::IdempotentReplay.http_status(), 200);
        assert_eq!(ErrorCode::FeatureDisabled.http_status(), 503);
        assert_eq!(ErrorCode::GovernanceUnavailable.http_status(), 503);
        assert_eq!(ErrorCode::InternalError.http_status(), 500);
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&ErrorCode::ScopeDenied).unwrap();
        assert_eq!(json, "\"SCOPE_DENIED\"");
    }
}
