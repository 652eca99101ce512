//! Event payloads published on the bus.

use serde::{Deserialize, Serialize};

use itin_model::{ItineraryId, NodeId};

/// `agentKind` values from the agent registry contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentKind {
    Planner,
    Enrichment,
    Editor,
    Booking,
    Explainer,
    Places,
    Skeleton,
    Activity,
    Meal,
    Transport,
    Cost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentEventStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

/// Agent lifecycle/progress event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    pub agent_id: String,
    pub agent_kind: AgentKind,
    pub status: AgentEventStatus,
    pub progress: u8,
    pub message: Option<String>,
    pub step: Option<String>,
    pub timestamp: i64,
    pub itinerary_id: ItineraryId,
}

/// Document patch event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PatchEvent {
    PatchApplied { itinerary_id: ItineraryId, to_version: u64 },
    VersionUpdated { itinerary_id: ItineraryId, to_version: u64 },
    NodeLocked { itinerary_id: ItineraryId, node_id: NodeId },
    NodeUnlocked { itinerary_id: ItineraryId, node_id: NodeId },
}

impl PatchEvent {
    #[must_use]
    pub fn itinerary_id(&self) -> &ItineraryId {
        match self {
            PatchEvent::PatchApplied { itinerary_id, .. }
            | PatchEvent::VersionUpdated { itinerary_id, .. }
            | PatchEvent::NodeLocked { itinerary_id, .. }
            | PatchEvent::NodeUnlocked { itinerary_id, .. } => itinerary_id,
        }
    }
}

/// The two event families the bus carries, both scoped to one itinerary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BusEvent {
    Agent(AgentEvent),
    Patch(PatchEvent),
}

impl BusEvent {
    #[must_use]
    pub fn itinerary_id(&self) -> &ItineraryId {
        match self {
            BusEvent::Agent(e) => &e.itinerary_id,
            BusEvent::Patch(p) => p.itinerary_id(),
        }
    }
}
