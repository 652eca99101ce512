//! Change-engine error kinds. Surfaced to callers verbatim — the engine
//! never swallows a mutation error.

use itin_model::{ErrorKind, ModelError, NodeId};
use itin_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ChangeEngineError {
    #[error("itinerary not found")]
    ItineraryNotFound,
    #[error("version conflict: baseVersion did not match current document version")]
    VersionConflict,
    #[error("node {0} is locked")]
    NodeLocked(NodeId),
    #[error("after node {0} not found")]
    AfterNotFound(NodeId),
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
    #[error("schema invalid: {0}")]
    SchemaInvalid(String),
    #[error("write conflict after retries exhausted")]
    WriteConflict,
    #[error("no ops and no reason given")]
    NoOps,
    #[error("invalid state transition: {0}")]
    InvalidStateTransition(#[from] ModelError),
    #[error("idempotency race: no result observed within the wait window")]
    IdempotencyRace,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ChangeEngineError {
    /// Transport-independent error kind, matching the flat set named by the
    /// error-handling contract.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChangeEngineError::ItineraryNotFound | ChangeEngineError::Store(_) => {
                ErrorKind::ItineraryNotFound
            }
            ChangeEngineError::VersionConflict => ErrorKind::VersionConflict,
            ChangeEngineError::NodeLocked(_) => ErrorKind::NodeLocked,
            ChangeEngineError::AfterNotFound(_) => ErrorKind::AfterNotFound,
            ChangeEngineError::NodeNotFound(_) => ErrorKind::NodeNotFound,
            ChangeEngineError::SchemaInvalid(_) => ErrorKind::SchemaInvalid,
            ChangeEngineError::WriteConflict => ErrorKind::WriteConflict,
            ChangeEngineError::NoOps => ErrorKind::NoOps,
            ChangeEngineError::InvalidStateTransition(_) => ErrorKind::InvalidStateTransition,
            ChangeEngineError::IdempotencyRace => ErrorKind::IdempotencyRace,
        }
    }
}
