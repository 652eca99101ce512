//! Node: the atomic itinerary item, and its status state machine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::ModelError;
use crate::ids::NodeId;

/// Kind of itinerary item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Attraction,
    Meal,
    Accommodation,
    Transport,
}

/// Lifecycle status of a node.
///
/// `planned -> {in_progress, skipped, cancelled}`, `in_progress ->
/// {completed, cancelled}`; `{completed, cancelled, skipped}` are terminal
/// and never transition out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Planned,
    InProgress,
    Skipped,
    Cancelled,
    Completed,
}

impl NodeStatus {
    /// Allowed next states from this state.
    #[must_use]
    pub fn allowed_transitions(self) -> &'static [NodeStatus] {
        match self {
            NodeStatus::Planned => &[
                NodeStatus::InProgress,
                NodeStatus::Skipped,
                NodeStatus::Cancelled,
            ],
            NodeStatus::InProgress => &[NodeStatus::Completed, NodeStatus::Cancelled],
            NodeStatus::Skipped | NodeStatus::Cancelled | NodeStatus::Completed => &[],
        }
    }

    /// Whether `self` may transition to `next`.
    #[must_use]
    pub fn can_transition_to(self, next: NodeStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Validate and return the target status, or a `ModelError` describing
    /// the illegal transition.
    pub fn transition_to(self, next: NodeStatus) -> Result<NodeStatus, ModelError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ModelError::InvalidTransition { from: self, to: next })
        }
    }
}

/// Geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    /// Valid range per the enrichment contract: lat in [-90,90], lng in
    /// [-180,180], and not the "unset" sentinel of both magnitudes under
    /// 1e-4 (which also rejects (0,0)).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return false;
        }
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lng) {
            return false;
        }
        self.lat.abs() >= 1e-4 || self.lng.abs() >= 1e-4
    }
}

/// Photo reference (opaque to the core — actual bytes live with the
/// provider).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub reference: String,
}

/// A single review, de-duplicated by author during enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub author: String,
    pub rating: Option<f32>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: Option<String>,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub place_id: Option<String>,
    pub photos: Vec<PhotoRef>,
    pub rating: Option<f32>,
    pub user_ratings_total: Option<u32>,
    pub price_level: Option<u8>,
}

/// Timing fields; epoch-ms or unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub duration_min: Option<u32>,
}

/// Granularity a cost applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostPer {
    Person,
    Group,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    pub amount: Option<u32>,
    pub currency: Option<String>,
    pub per: Option<CostPer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Details {
    pub rating: Option<f32>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub reviews: Vec<Review>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tips {
    pub warnings: Vec<String>,
    pub travel: Vec<String>,
    pub general: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Links {
    pub booking: Option<String>,
    pub website: Option<String>,
    pub reviews: Option<String>,
}

/// An itinerary item: an attraction, meal, accommodation, or transport leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub title: String,
    #[serde(default)]
    pub location: Location,
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub cost: Cost,
    #[serde(default)]
    pub details: Details,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub tips: Tips,
    #[serde(default)]
    pub links: Links,
    /// When true the node is immutable to agent-initiated changes.
    pub locked: bool,
    pub status: NodeStatus,
    pub updated_by: String,
    pub updated_at: i64,
    /// Open-ended map keyed by concern ("location", "photos", "booking",
    /// …); opaque to the change engine.
    #[serde(default)]
    pub agent_data: HashMap<String, serde_json::Value>,
}

impl Node {
    /// Whether this node's title still looks like a skeleton placeholder,
    /// used by populators to decide whether a re-run should overwrite it.
    #[must_use]
    pub fn looks_like_placeholder(&self) -> bool {
        const PLACEHOLDERS: &[&str] = &[
            "Morning Activity",
            "Afternoon Activity",
            "Evening Activity",
            "Breakfast",
            "Lunch",
            "Dinner",
            "Transport",
            "Accommodation",
        ];
        PLACEHOLDERS.iter().any(|p| self.title == *p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn planned_can_go_to_in_progress_but_not_completed() {
        assert!(NodeStatus::Planned.can_transition_to(NodeStatus::InProgress));
        assert!(!NodeStatus::Planned.can_transition_to(NodeStatus::Completed));
    }

    #[test]
    fn terminal_states_have_no_transitions() {
        assert!(NodeStatus::Completed.allowed_transitions().is_empty());
        assert!(NodeStatus::Cancelled.allowed_transitions().is_empty());
        assert!(NodeStatus::Skipped.allowed_transitions().is_empty());
    }

    #[test]
    fn transition_to_rejects_illegal_move() {
        let err = NodeStatus::Completed
            .transition_to(NodeStatus::Planned)
            .unwrap_err();
        assert!(matches!(err, ModelError::InvalidTransition { .. }));
    }

    #[test]
    fn coordinates_reject_zero_sentinel() {
        let c = Coordinates { lat: 0.0, lng: 0.0 };
        assert!(!c.is_valid());
    }

    #[test]
    fn coordinates_reject_out_of_range() {
        let c = Coordinates { lat: 95.0, lng: 10.0 };
        assert!(!c.is_valid());
    }

    #[test]
    fn coordinates_accept_valid() {
        let c = Coordinates { lat: 35.71, lng: 139.79 };
        assert!(c.is_valid());
    }

    #[test]
    fn placeholder_detection() {
        let mut node = sample_node();
        node.title = "Morning Activity".to_string();
        assert!(node.looks_like_placeholder());
        node.title = "Senso-ji Temple".to_string();
        assert!(!node.looks_like_placeholder());
    }

    fn sample_node() -> Node {
        Node {
            id: NodeId::skeleton(1, 1),
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

    fn all_statuses() -> [NodeStatus; 5] {
        [
            NodeStatus::Planned,
            NodeStatus::InProgress,
            NodeStatus::Skipped,
            NodeStatus::Cancelled,
            NodeStatus::Completed,
        ]
    }

    fn arb_status() -> impl Strategy<Value = NodeStatus> {
        proptest::sample::select(all_statuses().to_vec())
    }

    proptest! {
        /// `transition_to` agrees with `can_transition_to` for every pair,
        /// and surfaces the offending pair on rejection.
        #[test]
        fn transition_to_agrees_with_can_transition_to(from in arb_status(), to in arb_status()) {
            let allowed = from.can_transition_to(to);
            let result = from.transition_to(to);
            prop_assert_eq!(result.is_ok(), allowed);
            if !allowed {
                prop_assert!(matches!(result, Err(ModelError::InvalidTransition { from: f, to: t }) if f == from && t == to));
            }
        }

        /// Terminal states never transition anywhere, for any candidate
        /// target.
        #[test]
        fn terminal_states_reject_every_target(to in arb_status()) {
            for terminal in [NodeStatus::Completed, NodeStatus::Cancelled, NodeStatus::Skipped] {
                prop_assert!(!terminal.can_transition_to(to));
            }
        }

        /// Any coordinate pair accepted as valid stays within documented
        /// bounds and away from the (0,0) sentinel.
        #[test]
        fn valid_coordinates_stay_in_bounds(lat in -90.0f64..=90.0, lng in -180.0f64..=180.0) {
            let c = Coordinates { lat, lng };
            if c.is_valid() {
                prop_assert!((-90.0..=90.0).contains(&c.lat));
                prop_assert!((-180.0..=180.0).contains(&c.lng));
                prop_assert!(c.lat.abs() >= 1e-4 || c.lng.abs() >= 1e-4);
            }
        }

        /// The (0,0)-ish sentinel is never accepted regardless of how close
        /// to zero both components land.
        #[test]
        fn near_zero_sentinel_always_rejected(lat in -1e-5f64..=1e-5, lng in -1e-5f64..=1e-5) {
            let c = Coordinates { lat, lng };
            prop_assert!(!c.is_valid());
        }
    }
}
