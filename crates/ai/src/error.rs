use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("model artifact could not be read: {0}")]
    Artifact(String),

    #[error("model artifact is inconsistent: {0}")]
    Inconsistent(String),
}
