//! Versioned itinerary document model.
//!
//! # Core Concepts
//!
//! - [`Itinerary`]: the aggregate root, single-writer per id.
//! - [`Day`] / [`Node`]: the document's nested structure.
//! - [`ChangeSet`] / [`ChangeOperation`] / [`Diff`]: the mutation vocabulary
//!   the change engine consumes and emits.
//! - [`Revision`]: an append-only record of a past document state.
//!
//! # Example
//!
//! ```rust,ignore
//! use itin_model::{Itinerary, NodeStatus};
//!
//! let next = NodeStatus::Planned.transition_to(NodeStatus::InProgress)?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod change;
mod day;
mod error;
mod ids;
mod itinerary;
mod node;
mod revision;
mod wire;

pub use change::{ChangeOperation, ChangeSet, Diff, DiffEntry, EdgeKey, Preferences};
pub use day::{Day, Edge, TransitInfo};
pub use error::{ErrorKind, ModelError};
pub use ids::{AgentInstanceId, ItineraryId, NodeId, RevisionId};
pub use itinerary::{
    AgentState, AgentStatusRecord, BudgetTier, DefaultScope, Itinerary, Scope, Settings,
};
pub use node::{
    Coordinates, Cost, CostPer, Details, Links, Location, Node, NodeStatus, NodeType, PhotoRef,
    Review, Tips, Timing,
};
pub use revision::Revision;
pub use wire::{
    ChatRequest, ChatResponse, CreateItineraryAck, CreateItineraryReq, Intent, NodeCandidate,
    NormalizedItinerary, PartySpec, SseEnvelope, SseEventType,
};

/// Commonly used types, re-exported for glob import by downstream crates.
pub mod prelude {
    pub use crate::{
        ChangeOperation, ChangeSet, Day, Diff, Edge, Itinerary, ItineraryId, ModelError, Node,
        NodeId, NodeStatus, NodeType, Revision, RevisionId, Scope,
    };
}

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::collections::HashMap;

    fn sample_node(id: &str) -> Node {
        Node {
            id: NodeId::from_string(id),
            node_type: NodeType::Attraction,
            title: "Morning Activity".to_string(),
            location: Location::default(),
            timing: Timing::default(),
            cost: Cost::default(),
            details: Details::default(),
            labels: vec![],
            tips: Tips::default(),
            links: Links::default(),
            locked: false,
            status: NodeStatus::Planned,
            updated_by: "skeleton".to_string(),
            updated_at: 0,
            agent_data: HashMap::new(),
        }
    }

    #[test]
    fn full_document_round_trips_through_json() {
        let itin = Itinerary {
            id: ItineraryId::from_string("trip-1"),
            version: 1,
            user_id: "u1".to_string(),
            destination: "Tokyo".to_string(),
            start_date: "2025-10-04".to_string(),
            end_date: "2025-10-06".to_string(),
            themes: vec!["food".to_string()],
            currency: "USD".to_string(),
            budget_tier: BudgetTier::Medium,
            days: vec![Day {
                day_number: 1,
                date: "2025-10-04".to_string(),
                location: Some("Tokyo".to_string()),
                summary: None,
                total_cost: None,
                nodes: vec![sample_node("day1_node1")],
                edges: vec![],
            }],
            settings: Settings::default(),
            agents: HashMap::new(),
            created_at: 0,
            updated_at: 0,
        };
        itin.check_invariants().unwrap();

        let json = serde_json::to_string(&itin).unwrap();
        let back: Itinerary = serde_json::from_str(&json).unwrap();
        assert_eq!(itin, back);
    }

    #[test]
    fn diff_entry_identifies_moved_node_day() {
        let itin = Itinerary {
            id: ItineraryId::from_string("trip-2"),
            version: 1,
            user_id: "u1".to_string(),
            destination: "Kyoto".to_string(),
            start_date: "2025-11-01".to_string(),
            end_date: "2025-11-02".to_string(),
            themes: vec![],
            currency: "JPY".to_string(),
            budget_tier: BudgetTier::Medium,
            days: vec![
                Day {
                    day_number: 1,
                    date: "2025-11-01".to_string(),
                    location: None,
                    summary: None,
                    total_cost: None,
                    nodes: vec![sample_node("day1_node1")],
                    edges: vec![],
                },
                Day {
                    day_number: 2,
                    date: "2025-11-02".to_string(),
                    location: None,
                    summary: None,
                    total_cost: None,
                    nodes: vec![],
                    edges: vec![],
                },
            ],
            settings: Settings::default(),
            agents: HashMap::new(),
            created_at: 0,
            updated_at: 0,
        };
        assert_eq!(itin.day_containing(&NodeId::from_string("day1_node1")), Some(1));
        assert_eq!(itin.day_containing(&NodeId::from_string("missing")), None);
    }
}
