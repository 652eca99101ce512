//! Orchestrator-level errors: creation failures the `generate` pipeline
//! cannot recover from.

use itin_model::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("invalid create request: {0}")]
    InvalidRequest(String),
    #[error("document store error: {0}")]
    Store(String),
    #[error("skeleton agent failed: {0}")]
    SkeletonFailed(String),
}

impl OrchestratorError {
    /// Transport-independent error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrchestratorError::InvalidRequest(_) => ErrorKind::SchemaInvalid,
            OrchestratorError::Store(_) => ErrorKind::Internal,
            OrchestratorError::SkeletonFailed(_) => ErrorKind::AgentTimeout,
        }
    }
}
