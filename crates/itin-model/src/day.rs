//! Day: an ordered sequence of nodes and the edges between them.

use serde::{Deserialize, Serialize};

use crate::ids::NodeId;
use crate::node::Node;

/// A directed edge between two nodes within the same day, optionally
/// annotated with transit details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub transit: Option<TransitInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitInfo {
    pub mode: Option<String>,
    pub duration_min: Option<u32>,
}

/// A single day of the itinerary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Day {
    pub day_number: u32,
    /// ISO-8601 date, e.g. "2025-10-04".
    pub date: String,
    pub location: Option<String>,
    pub summary: Option<String>,
    pub total_cost: Option<u32>,
    /// User-facing order; not automatically time-sorted.
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Day {
    #[must_use]
    pub fn find_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    #[must_use]
    pub fn find_node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| &n.id == id)
    }

    #[must_use]
    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| &n.id == id)
    }

    /// Recompute `total_cost` as the sum of every node's known cost amount.
    pub fn recompute_total_cost(&mut self) {
        let sum: u32 = self.nodes.iter().filter_map(|n| n.cost.amount).sum();
        self.total_cost = Some(sum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Cost, Details, Links, Location, NodeStatus, NodeType, Timing, Tips};
    use std::collections::HashMap;

    fn node(id: &str, amount: Option<u32>) -> Node {
        Node {
            id: NodeId::from_string(id),
            node_type: NodeType::Attraction,
            title: "x".to_string(),
            location: Location::default(),
            timing: Timing::default(),
            cost: Cost { amount, currency: None, per: None },
            details: Details::default(),
            labels: vec![],
            tips: Tips::default(),
            links: Links::default(),
            locked: false,
            status: NodeStatus::Planned,
            updated_by: "t".to_string(),
            updated_at: 0,
            agent_data: HashMap::new(),
        }
    }

    #[test]
    fn recompute_total_cost_sums_known_amounts() {
        let mut day = Day {
            day_number: 1,
            date: "2025-10-04".to_string(),
            location: None,
            summary: None,
            total_cost: None,
            nodes: vec![node("a", Some(10)), node("b", None), node("c", Some(5))],
            edges: vec![],
        };
        day.recompute_total_cost();
        assert_eq!(day.total_cost, Some(15));
    }

    #[test]
    fn find_node_locates_by_id() {
        let day = Day {
            day_number: 1,
            date: "2025-10-04".to_string(),
            location: None,
            summary: None,
            total_cost: None,
            nodes: vec![node("a", None)],
            edges: vec![],
        };
        assert!(day.find_node(&NodeId::from_string("a")).is_some());
        assert!(day.find_node(&NodeId::from_string("missing")).is_none());
    }
}
