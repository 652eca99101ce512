//! Wire DTOs for the HTTP/SSE boundary described by the external
//! interfaces contract. No transport is implemented here — these are the
//! shapes a transport layer would serialize, kept ready so the core can
//! be wired up without guessing at field names later.

use serde::{Deserialize, Serialize};

use crate::change::{ChangeSet, Diff};
use crate::ids::{ItineraryId, NodeId};
use crate::itinerary::{BudgetTier, Itinerary};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartySpec {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItineraryReq {
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub duration_days: u32,
    pub party: PartySpec,
    pub budget_tier: BudgetTier,
    #[serde(default)]
    pub interests: Vec<String>,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateItineraryAck {
    pub id: ItineraryId,
    pub status: String,
}

/// The fully materialized itinerary as returned to API callers. Distinct
/// type alias from the internal model so the wire shape can evolve
/// independently of the change-engine's working representation.
pub type NormalizedItinerary = Itinerary;

/// High-level conversational intent classified from a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    ReplanToday,
    MoveTime,
    InsertPlace,
    DeleteNode,
    ReplaceNode,
    BookNode,
    Undo,
    Explain,
    Disambiguation,
    Unknown,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub itinerary_id: ItineraryId,
    pub message: String,
    #[serde(default)]
    pub auto_apply: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeCandidate {
    pub node_id: NodeId,
    pub day: u32,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub intent: Intent,
    pub message: String,
    pub change_set: Option<ChangeSet>,
    pub diff: Option<Diff>,
    pub applied: bool,
    pub to_version: Option<u64>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub needs_disambiguation: bool,
    #[serde(default)]
    pub candidates: Vec<NodeCandidate>,
    #[serde(default)]
    pub errors: Vec<String>,
}

/// SSE event families published on the bus. Framed by a transport layer as
/// `event: <type>\ndata: <json>\n\n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SseEventType {
    Connected,
    AgentProgress,
    AgentComplete,
    PatchApplied,
    VersionUpdated,
    NodeLocked,
    NodeUnlocked,
    Error,
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SseEnvelope {
    pub event: SseEventType,
    pub data: serde_json::Value,
}
