use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("execution '{0}' not found")]
    NotFound(String),
    #[error("step {1} of execution '{0}' not found")]
    StepNotFound(String, u32),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}
