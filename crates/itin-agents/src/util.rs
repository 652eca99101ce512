//! Small helpers shared across agent implementations.

use itin_model::NodeType;

/// Lowercase wire-style label for a node type, used in cost-table keys,
/// populator prompts, and id generation.
pub(crate) fn node_type_label(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Attraction => "attraction",
        NodeType::Meal => "meal",
        NodeType::Accommodation => "accommodation",
        NodeType::Transport => "transport",
    }
}
