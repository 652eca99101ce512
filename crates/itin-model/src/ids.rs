//! Strongly-typed identifiers used throughout the itinerary document model.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique id of an itinerary document.
///
/// Caller-assigned or generated; opaque beyond uniqueness.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItineraryId(String);

impl ItineraryId {
    /// Generate a new random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Wrap a caller-supplied id verbatim.
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ItineraryId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ItineraryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ItineraryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Unique id of a node within an itinerary.
///
/// Convention: `dayK_nodeN` for skeleton-generated nodes, or
/// `node_<type>_day<K>_<epochms>_<rand4>` for agent-inserted ones. The
/// format is a convention, not an enforced grammar — ids are opaque to
/// consumers but must be stable across versions and never reused after
/// deletion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    #[must_use]
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Build the deterministic skeleton-style id `dayK_nodeN`.
    #[must_use]
    pub fn skeleton(day: u32, index: u32) -> Self {
        Self(format!("day{day}_node{index}"))
    }

    /// Build an agent-generated id: `node_<type>_day<K>_<epochms>_<rand4>`.
    #[must_use]
    pub fn generated(node_type: &str, day: u32, epoch_ms: i64, rand4: &str) -> Self {
        Self(format!("node_{node_type}_day{day}_{epoch_ms}_{rand4}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Id of an append-only revision record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RevisionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RevisionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Id of a single running instance of an agent (distinct from its kind).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentInstanceId(Ulid);

impl AgentInstanceId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for AgentInstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for AgentInstanceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AgentInstanceId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Ulid::from_str(s)?))
    }
}
