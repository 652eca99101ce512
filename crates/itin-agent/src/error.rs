//! Agent execution errors.

use itin_change::ChangeEngineError;
use itin_model::ErrorKind;

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent cannot handle task type {0}")]
    CannotHandle(String),
    #[error("model call failed: {0}")]
    Model(String),
    #[error("provider call failed: {0}")]
    Provider(String),
    #[error("agent timed out")]
    Timeout,
    #[error(transparent)]
    Change(#[from] ChangeEngineError),
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Transport-independent error kind.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::CannotHandle(_) => ErrorKind::AgentCannotHandle,
            AgentError::Model(_) => ErrorKind::ModelCallFailed,
            AgentError::Provider(_) => ErrorKind::ProviderCallFailed,
            AgentError::Timeout => ErrorKind::AgentTimeout,
            AgentError::Change(e) => e.kind(),
            AgentError::Other(_) => ErrorKind::Internal,
        }
    }
}
