use thiserror::Error;

/// Downstream service errors
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("HTTP error: {0}")]
    Http(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
