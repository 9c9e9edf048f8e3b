use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

/// Every failure aborts the operation before any field of the session changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElectionError {
    #[error("not authorized: {0}")]
    Authorization(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("invalid input: {0}")]
    Validation(String),
}

impl ElectionError {
    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization(message.into())
    }

    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            ElectionError::Authorization(_) => ErrorCode::Forbidden,
            ElectionError::State(_) => ErrorCode::InvalidState,
            ElectionError::Validation(_) => ErrorCode::Validation,
        }
    }
}

impl From<ElectionError> for ApiError {
    fn from(value: ElectionError) -> Self {
        ApiError::new(value.code(), value.to_string())
    }
}

pub type ElectionResult<T> = Result<T, ElectionError>;
