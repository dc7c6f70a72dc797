use thiserror::Error;
use crate::models::ValidationError;
use crate::services::StoreError;

/// Errors surfaced by the matching engine
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl ExchangeError {
    pub(crate) fn request_not_found(id: impl std::fmt::Display) -> Self {
        ExchangeError::NotFound(format!("exchange request {}", id))
    }

    pub(crate) fn match_not_found(id: impl std::fmt::Display) -> Self {
        ExchangeError::NotFound(format!("exchange match {}", id))
    }
}

/// Result type for engine operations
pub type ExchangeResult<T> = std::result::Result<T, ExchangeError>;
