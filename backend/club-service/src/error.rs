/// Error types for club-service
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Store error: {0}")]
    Store(#[from] record_store::StoreError),

    #[error("No authenticated user for this session")]
    Unauthenticated,

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
