//! Crate-level error type, paired 1:1 with [`crate::error_code::ErrorCode`].

use thiserror::Error;

use crate::error_code::ErrorCode;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("invalid action name: {0}")]
    InvalidActionName(String),
    #[error("schema validation failed: {0}")]
    SchemaValidation(String),
}

impl TypesError {
    pub fn code(&self) -> ErrorCode {
        match self {
            TypesError::InvalidActionName(_) => ErrorCode::ValidationError,
            TypesError::SchemaValidation(_) => ErrorCode::ValidationError,
        }
    }
}

pub type Result<T> = std::result::Result<T, TypesError>;
