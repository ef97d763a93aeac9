use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no discount prediction for category: {0}")]
    UnknownCategory(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

pub type DomainResult<T> = Result<T, DomainError>;
