//! Document-level invariant violations, and the flat error classification
//! shared across every component's own error enum.

use std::fmt::{self, Display, Formatter};

use crate::ids::NodeId;
use crate::node::NodeStatus;

/// Errors produced while constructing or mutating a document's own
/// invariants, independent of change-engine policy (locks, versioning).
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ModelError {
    #[error("day numbering is not contiguous: expected day {expected}, found {actual}")]
    DayNumberMismatch { expected: u32, actual: u32 },

    #[error("day endDate {end} is before startDate {start}")]
    EndBeforeStart { start: String, end: String },

    #[error("duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    #[error("edge references missing node: {0}")]
    DanglingEdge(NodeId),

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("invalid status transition from {from:?} to {to:?}")]
    InvalidTransition { from: NodeStatus, to: NodeStatus },
}

impl ModelError {
    /// Transport-independent error kind, shared by every component error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::DayNumberMismatch { .. }
            | ModelError::EndBeforeStart { .. }
            | ModelError::DuplicateNodeId(_)
            | ModelError::DanglingEdge(_) => ErrorKind::SchemaInvalid,
            ModelError::NodeNotFound(_) => ErrorKind::NodeNotFound,
            ModelError::InvalidTransition { .. } => ErrorKind::InvalidStateTransition,
        }
    }
}

/// Transport-independent classification of every error this workspace can
/// produce, with a user-facing [`Display`] string. Each component's own
/// `thiserror` enum (`ChangeEngineError`, `AgentError`, `ChatError`, ...)
/// carries a `kind() -> ErrorKind` accessor so callers can map to one of
/// these codes without matching on every concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ItineraryNotFound,
    VersionConflict,
    NodeLocked,
    AfterNotFound,
    NodeNotFound,
    SchemaInvalid,
    WriteConflict,
    NoOps,
    InvalidStateTransition,
    IdempotencyRace,
    AgentCannotHandle,
    AgentTimeout,
    ModelCallFailed,
    ProviderCallFailed,
    BookingFailed,
    Disambiguation,
    IntentUnknown,
    Internal,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let message = match self {
            ErrorKind::ItineraryNotFound => "This itinerary could not be found.",
            ErrorKind::VersionConflict => "This itinerary changed since you last loaded it.",
            ErrorKind::NodeLocked => "That item is locked and can't be changed this way.",
            ErrorKind::AfterNotFound => "The reference point for that change no longer exists.",
            ErrorKind::NodeNotFound => "That item no longer exists in this itinerary.",
            ErrorKind::SchemaInvalid => "That request didn't match the expected shape.",
            ErrorKind::WriteConflict => "We couldn't save that change after several attempts.",
            ErrorKind::NoOps => "There was nothing to change.",
            ErrorKind::InvalidStateTransition => "That status change isn't allowed from here.",
            ErrorKind::IdempotencyRace => "A duplicate of this request is still being processed.",
            ErrorKind::AgentCannotHandle => "No agent is available to handle that request.",
            ErrorKind::AgentTimeout => "That step took too long and was abandoned.",
            ErrorKind::ModelCallFailed => "The assistant couldn't generate a usable response.",
            ErrorKind::ProviderCallFailed => "An external service needed for that step failed.",
            ErrorKind::BookingFailed => "That booking could not be completed.",
            ErrorKind::Disambiguation => "More than one item matches — please clarify which one.",
            ErrorKind::IntentUnknown => "We couldn't tell what you'd like to change.",
            ErrorKind::Internal => "Something went wrong on our side.",
        };
        f.write_str(message)
    }
}
