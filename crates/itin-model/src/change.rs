//! Change sets, operations, and the diffs the change engine emits.

use serde::{Deserialize, Serialize};

use crate::day::TransitInfo;
use crate::ids::NodeId;
use crate::itinerary::Scope;
use crate::node::Node;

/// Preferences governing how a change set is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    /// When true, a user-initiated change bypasses lock enforcement.
    pub user_first: bool,
    pub respect_locks: bool,
    pub auto_apply: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self { user_first: false, respect_locks: true, auto_apply: false }
    }
}

/// Key identifying an edge for `update_edge`: either an explicit id
/// (parsed as `"{from}->{to}"`) or an explicit `(from, to)` pair. Both
/// forms normalize to the same `(from, to)` tuple before lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdgeKey {
    pub from: NodeId,
    pub to: NodeId,
}

impl EdgeKey {
    #[must_use]
    pub fn new(from: NodeId, to: NodeId) -> Self {
        Self { from, to }
    }

    /// Parse an explicit edge id of the form `"{from}->{to}"`.
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        let (from, to) = id.split_once("->")?;
        Some(Self { from: NodeId::from_string(from), to: NodeId::from_string(to) })
    }
}

/// A single mutating operation within a change set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ChangeOperation {
    Insert {
        /// Insert after this node, or at the head of the day if `None`.
        after: Option<NodeId>,
        node: Node,
    },
    Delete {
        id: NodeId,
    },
    Move {
        id: NodeId,
        start_time: Option<i64>,
        end_time: Option<i64>,
        to_day: Option<u32>,
        after_node: Option<NodeId>,
    },
    Replace {
        id: NodeId,
        node: Node,
    },
    Update {
        id: NodeId,
        /// Deep-merge patch; absent/null fields leave the existing value
        /// unset.
        partial: serde_json::Value,
    },
    UpdateEdge {
        id: Option<String>,
        from: Option<NodeId>,
        to: Option<NodeId>,
        transit: Option<TransitInfo>,
    },
}

impl ChangeOperation {
    /// The node id this op primarily targets, for lock pre-checks and
    /// diagnostics. `Insert` has no target (it creates a new node) and
    /// `UpdateEdge` targets an edge, not a node.
    #[must_use]
    pub fn target_node_id(&self) -> Option<&NodeId> {
        match self {
            ChangeOperation::Insert { .. } => None,
            ChangeOperation::Delete { id }
            | ChangeOperation::Move { id, .. }
            | ChangeOperation::Replace { id, .. }
            | ChangeOperation::Update { id, .. } => Some(id),
            ChangeOperation::UpdateEdge { .. } => None,
        }
    }

    /// Resolve the edge key for an `UpdateEdge` op, accepting either the
    /// explicit `id` shape or the explicit `from`/`to` shape.
    #[must_use]
    pub fn edge_key(&self) -> Option<EdgeKey> {
        match self {
            ChangeOperation::UpdateEdge { id, from, to, .. } => {
                if let (Some(from), Some(to)) = (from, to) {
                    return Some(EdgeKey::new(from.clone(), to.clone()));
                }
                id.as_deref().and_then(EdgeKey::from_id)
            }
            _ => None,
        }
    }
}

/// An ordered batch of operations to apply to one itinerary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeSet {
    pub scope: Scope,
    /// Required iff `scope == Day`.
    pub day: Option<u32>,
    pub base_version: Option<u64>,
    pub idempotency_key: Option<String>,
    pub ops: Vec<ChangeOperation>,
    pub preferences: Preferences,
    pub reason: Option<String>,
    /// Source tag, e.g. `"editor"`, `"change-engine:undo"`.
    pub agent: String,
}

/// One entry in a diff's added/removed/updated lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffEntry {
    pub node_id: NodeId,
    pub day: u32,
    pub fields: Option<Vec<String>>,
    pub title: Option<String>,
}

/// Compact record of added/removed/updated nodes between two versions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub added: Vec<DiffEntry>,
    pub removed: Vec<DiffEntry>,
    pub updated: Vec<DiffEntry>,
    pub to_version: u64,
}

impl Diff {
    /// Whether this diff touches no nodes at all (a no-op apply, e.g. a
    /// lock-blocked change set with zero ops).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }
}
