//! Itinerary: the aggregate root, single-writer per id.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::day::Day;
use crate::error::ModelError;
use crate::ids::ItineraryId;

/// Spend tier selected at creation time; read by the cost estimator to
/// pick its per-category multiplier and by the planner/editor when
/// drafting budget-aware language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetTier {
    Budget,
    Medium,
    Luxury,
}

impl Default for BudgetTier {
    fn default() -> Self {
        BudgetTier::Medium
    }
}

/// Scope a change set applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Trip,
    Day,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultScope {
    Trip,
    Day,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub auto_apply: bool,
    pub default_scope: DefaultScope,
}

impl Default for Settings {
    fn default() -> Self {
        Self { auto_apply: false, default_scope: DefaultScope::Trip }
    }
}

/// Lifecycle state of one agent against one itinerary, as seen by readers
/// of the `agents` status map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    Queued,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStatusRecord {
    pub state: AgentState,
    pub progress: u8,
    pub message: Option<String>,
    pub step: Option<String>,
    pub updated_at: i64,
}

/// The itinerary aggregate root.
///
/// Single-writer contract per id: all mutation flows through the change
/// engine, never directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Itinerary {
    pub id: ItineraryId,
    pub version: u64,
    pub user_id: String,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    pub themes: Vec<String>,
    pub currency: String,
    pub budget_tier: BudgetTier,
    pub days: Vec<Day>,
    pub settings: Settings,
    pub agents: HashMap<String, AgentStatusRecord>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Itinerary {
    /// Validate the structural invariants from the data model: version is
    /// at least 1, day numbering is 1..N contiguous, and end is not before
    /// start (lexicographic ISO-8601 comparison is sufficient here).
    pub fn check_invariants(&self) -> Result<(), ModelError> {
        if self.version < 1 {
            return Err(ModelError::DayNumberMismatch { expected: 1, actual: 0 });
        }
        for (i, day) in self.days.iter().enumerate() {
            let expected = (i + 1) as u32;
            if day.day_number != expected {
                return Err(ModelError::DayNumberMismatch { expected, actual: day.day_number });
            }
        }
        if self.end_date < self.start_date {
            return Err(ModelError::EndBeforeStart {
                start: self.start_date.clone(),
                end: self.end_date.clone(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        for day in &self.days {
            for node in &day.nodes {
                if !seen.insert(node.id.clone()) {
                    return Err(ModelError::DuplicateNodeId(node.id.clone()));
                }
            }
        }
        for day in &self.days {
            for edge in &day.edges {
                if day.find_node(&edge.from).is_none() {
                    return Err(ModelError::DanglingEdge(edge.from.clone()));
                }
                if day.find_node(&edge.to).is_none() {
                    return Err(ModelError::DanglingEdge(edge.to.clone()));
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn find_day(&self, day_number: u32) -> Option<&Day> {
        self.days.iter().find(|d| d.day_number == day_number)
    }

    #[must_use]
    pub fn find_day_mut(&mut self, day_number: u32) -> Option<&mut Day> {
        self.days.iter_mut().find(|d| d.day_number == day_number)
    }

    /// The day number containing a node, if any.
    #[must_use]
    pub fn day_containing(&self, id: &crate::ids::NodeId) -> Option<u32> {
        self.days
            .iter()
            .find(|d| d.find_node(id).is_some())
            .map(|d| d.day_number)
    }
}
