//! Step 5 of the apply algorithm: executing ops in order against a
//! working copy of the document.

use rand::Rng;
use serde_json::Value;

use itin_model::{ChangeOperation, ChangeSet, Day, Edge, Itinerary, Node, NodeId, NodeStatus};

use crate::error::ChangeEngineError;

fn day_containing_mut<'a>(doc: &'a mut Itinerary, id: &NodeId) -> Option<&'a mut Day> {
    doc.days.iter_mut().find(|d| d.find_node(id).is_some())
}

fn generate_node_id(node_type: &str, day: u32, now_ms: i64) -> NodeId {
    let rand_suffix: String = {
        let mut rng = rand::rng();
        (0..4).map(|_| std::char::from_digit(rng.random_range(0..16), 16).unwrap()).collect()
    };
    NodeId::generated(node_type, day, now_ms, &rand_suffix)
}

fn node_type_str(node: &Node) -> &'static str {
    match node.node_type {
        itin_model::NodeType::Attraction => "attraction",
        itin_model::NodeType::Meal => "meal",
        itin_model::NodeType::Accommodation => "accommodation",
        itin_model::NodeType::Transport => "transport",
    }
}

fn apply_insert(
    doc: &mut Itinerary,
    after: &Option<NodeId>,
    mut node: Node,
    default_day: Option<u32>,
    now_ms: i64,
) -> Result<(), ChangeEngineError> {
    let target_day_number = match after {
        Some(after_id) => doc
            .day_containing(after_id)
            .ok_or_else(|| ChangeEngineError::AfterNotFound(after_id.clone()))?,
        None => default_day.unwrap_or(1),
    };

    if node.id.as_str().is_empty() {
        node.id = generate_node_id(node_type_str(&node), target_day_number, now_ms);
    }

    let day = doc
        .find_day_mut(target_day_number)
        .ok_or_else(|| ChangeEngineError::NodeNotFound(node.id.clone()))?;

    match after {
        Some(after_id) => {
            let idx = day
                .node_index(after_id)
                .ok_or_else(|| ChangeEngineError::AfterNotFound(after_id.clone()))?;
            day.nodes.insert(idx + 1, node);
        }
        None => day.nodes.insert(0, node),
    }
    Ok(())
}

fn apply_delete(doc: &mut Itinerary, id: &NodeId) -> Result<(), ChangeEngineError> {
    let day = day_containing_mut(doc, id).ok_or_else(|| ChangeEngineError::NodeNotFound(id.clone()))?;
    let idx = day.node_index(id).ok_or_else(|| ChangeEngineError::NodeNotFound(id.clone()))?;
    day.nodes.remove(idx);
    day.edges.retain(|e| &e.from != id && &e.to != id);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn apply_move(
    doc: &mut Itinerary,
    id: &NodeId,
    start_time: Option<i64>,
    end_time: Option<i64>,
    to_day: Option<u32>,
    after_node: &Option<NodeId>,
) -> Result<(), ChangeEngineError> {
    let source_day_number =
        doc.day_containing(id).ok_or_else(|| ChangeEngineError::NodeNotFound(id.clone()))?;

    let moving_to_new_day = to_day.is_some_and(|d| d != source_day_number);

    let mut node = if moving_to_new_day {
        let source = doc.find_day_mut(source_day_number).expect("day located above");
        let idx = source.node_index(id).expect("node located above");
        source.edges.retain(|e| &e.from != id && &e.to != id);
        source.nodes.remove(idx)
    } else {
        let source = doc.find_day_mut(source_day_number).expect("day located above");
        let idx = source.node_index(id).expect("node located above");
        source.nodes.remove(idx)
    };

    if let Some(start) = start_time {
        node.timing.start_time = Some(start);
    }
    if let Some(end) = end_time {
        node.timing.end_time = Some(end);
    }

    let dest_day_number = to_day.unwrap_or(source_day_number);
    let dest = doc
        .find_day_mut(dest_day_number)
        .ok_or_else(|| ChangeEngineError::NodeNotFound(id.clone()))?;

    match after_node {
        Some(after_id) => {
            let idx = dest
                .node_index(after_id)
                .ok_or_else(|| ChangeEngineError::AfterNotFound(after_id.clone()))?;
            dest.nodes.insert(idx + 1, node);
        }
        // Resolved open question: moving to a new day with no afterNode
        // appends at the end of the destination day.
        None => dest.nodes.push(node),
    }
    Ok(())
}

fn apply_replace(doc: &mut Itinerary, id: &NodeId, mut node: Node) -> Result<(), ChangeEngineError> {
    let day = day_containing_mut(doc, id).ok_or_else(|| ChangeEngineError::NodeNotFound(id.clone()))?;
    let idx = day.node_index(id).ok_or_else(|| ChangeEngineError::NodeNotFound(id.clone()))?;
    let existing = &day.nodes[idx];
    node.id = existing.id.clone();
    node.locked = existing.locked;
    day.nodes[idx] = node;
    Ok(())
}

fn merge_json(base: &mut Value, patch: &Value) {
    match (base, patch) {
        (Value::Object(base_map), Value::Object(patch_map)) => {
            for (key, patch_value) in patch_map {
                if patch_value.is_null() {
                    // null leaves the existing value unset (untouched).
                    continue;
                }
                merge_json(base_map.entry(key.clone()).or_insert(Value::Null), patch_value);
            }
        }
        (base_slot, patch_value) => {
            *base_slot = patch_value.clone();
        }
    }
}

fn apply_update(doc: &mut Itinerary, id: &NodeId, partial: &Value) -> Result<(), ChangeEngineError> {
    let day = day_containing_mut(doc, id).ok_or_else(|| ChangeEngineError::NodeNotFound(id.clone()))?;
    let node = day.find_node_mut(id).ok_or_else(|| ChangeEngineError::NodeNotFound(id.clone()))?;

    if let Some(new_status) = partial.get("status").and_then(|v| v.as_str()) {
        let target = match new_status {
            "planned" => NodeStatus::Planned,
            "in_progress" => NodeStatus::InProgress,
            "skipped" => NodeStatus::Skipped,
            "cancelled" => NodeStatus::Cancelled,
            "completed" => NodeStatus::Completed,
            other => {
                return Err(ChangeEngineError::SchemaInvalid(format!("unknown status {other}")))
            }
        };
        node.status.transition_to(target)?;
    }

    let mut node_json = serde_json::to_value(&*node).map_err(|e| {
        ChangeEngineError::SchemaInvalid(format!("node serialization failed: {e}"))
    })?;
    merge_json(&mut node_json, partial);
    *node = serde_json::from_value(node_json)
        .map_err(|e| ChangeEngineError::SchemaInvalid(format!("merged node invalid: {e}")))?;
    Ok(())
}

fn apply_update_edge(
    doc: &mut Itinerary,
    key: &itin_model::EdgeKey,
    transit: Option<itin_model::TransitInfo>,
) -> Result<(), ChangeEngineError> {
    let day = doc
        .days
        .iter_mut()
        .find(|d| d.find_node(&key.from).is_some() && d.find_node(&key.to).is_some())
        .ok_or_else(|| ChangeEngineError::NodeNotFound(key.from.clone()))?;

    match day.edges.iter_mut().find(|e| e.from == key.from && e.to == key.to) {
        Some(edge) => edge.transit = transit,
        None => day.edges.push(Edge { from: key.from.clone(), to: key.to.clone(), transit }),
    }
    Ok(())
}

/// Execute every op in `change_set.ops`, in order, against `doc`.
/// `now_ms` stamps `updatedAt`/generated ids; `actor` stamps `updatedBy`.
pub fn execute_ops(
    doc: &mut Itinerary,
    change_set: &ChangeSet,
    now_ms: i64,
    actor: &str,
) -> Result<(), ChangeEngineError> {
    for op in &change_set.ops {
        match op {
            ChangeOperation::Insert { after, node } => {
                apply_insert(doc, after, node.clone(), change_set.day, now_ms)?;
            }
            ChangeOperation::Delete { id } => apply_delete(doc, id)?,
            ChangeOperation::Move { id, start_time, end_time, to_day, after_node } => {
                apply_move(doc, id, *start_time, *end_time, *to_day, after_node)?;
            }
            ChangeOperation::Replace { id, node } => apply_replace(doc, id, node.clone())?,
            ChangeOperation::Update { id, partial } => apply_update(doc, id, partial)?,
            ChangeOperation::UpdateEdge { transit, .. } => {
                let key = op
                    .edge_key()
                    .ok_or_else(|| ChangeEngineError::SchemaInvalid("update_edge missing from/to".to_string()))?;
                apply_update_edge(doc, &key, transit.clone())?;
            }
        }
        if let Some(id) = op.target_node_id() {
            if let Some(node) = doc.days.iter_mut().find_map(|d| d.find_node_mut(id)) {
                node.updated_by = actor.to_string();
                node.updated_at = now_ms;
            }
        }
    }
    for day in &mut doc.days {
        day.recompute_total_cost();
    }
    doc.updated_at = now_ms;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use itin_model::{
        BudgetTier, Cost, Details, Links, Location, NodeType, Preferences, Scope, Settings, Timing,
        Tips,
    };
    use std::collections::HashMap;

    fn node(id: &str) -> Node {
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

    fn itinerary() -> Itinerary {
        Itinerary {
            id: itin_model::ItineraryId::from_string("trip-1"),
            version: 1,
            user_id: "u1".to_string(),
            destination: "Tokyo".to_string(),
            start_date: "2025-10-04".to_string(),
            end_date: "2025-10-06".to_string(),
            themes: vec![],
            currency: "USD".to_string(),
            budget_tier: BudgetTier::Medium,
            days: vec![
                Day {
                    day_number: 1,
                    date: "2025-10-04".to_string(),
                    location: None,
                    summary: None,
                    total_cost: None,
                    nodes: vec![node("day1_node1"), node("day1_node2")],
                    edges: vec![],
                },
                Day {
                    day_number: 2,
                    date: "2025-10-05".to_string(),
                    location: None,
                    summary: None,
                    total_cost: None,
                    nodes: vec![node("day2_node1")],
                    edges: vec![],
                },
            ],
            settings: Settings::default(),
            agents: HashMap::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn change_set(ops: Vec<ChangeOperation>) -> ChangeSet {
        ChangeSet {
            scope: Scope::Trip,
            day: None,
            base_version: None,
            idempotency_key: None,
            ops,
            preferences: Preferences::default(),
            reason: None,
            agent: "test".to_string(),
        }
    }

    #[test]
    fn delete_removes_node_and_dangling_edges() {
        let mut doc = itinerary();
        doc.days[0].edges.push(Edge {
            from: NodeId::from_string("day1_node1"),
            to: NodeId::from_string("day1_node2"),
            transit: None,
        });
        let cs = change_set(vec![ChangeOperation::Delete { id: NodeId::from_string("day1_node1") }]);
        execute_ops(&mut doc, &cs, 100, "test").unwrap();
        assert_eq!(doc.days[0].nodes.len(), 1);
        assert!(doc.days[0].edges.is_empty());
    }

    #[test]
    fn move_across_days_appends_when_no_after_node() {
        let mut doc = itinerary();
        let cs = change_set(vec![ChangeOperation::Move {
            id: NodeId::from_string("day1_node1"),
            start_time: None,
            end_time: None,
            to_day: Some(2),
            after_node: None,
        }]);
        execute_ops(&mut doc, &cs, 100, "test").unwrap();
        assert_eq!(doc.days[0].nodes.len(), 1);
        assert_eq!(doc.days[1].nodes.len(), 2);
        assert_eq!(doc.days[1].nodes.last().unwrap().id.as_str(), "day1_node1");
    }

    #[test]
    fn insert_after_missing_node_fails() {
        let mut doc = itinerary();
        let cs = change_set(vec![ChangeOperation::Insert {
            after: Some(NodeId::from_string("missing")),
            node: node("new_node"),
        }]);
        let err = execute_ops(&mut doc, &cs, 100, "test").unwrap_err();
        assert!(matches!(err, ChangeEngineError::AfterNotFound(_)));
    }

    #[test]
    fn update_deep_merges_and_skips_null_fields() {
        let mut doc = itinerary();
        let cs = change_set(vec![ChangeOperation::Update {
            id: NodeId::from_string("day1_node1"),
            partial: serde_json::json!({ "title": "Senso-ji Temple", "labels": null }),
        }]);
        execute_ops(&mut doc, &cs, 100, "test").unwrap();
        let updated = doc.days[0].find_node(&NodeId::from_string("day1_node1")).unwrap();
        assert_eq!(updated.title, "Senso-ji Temple");
        assert!(updated.labels.is_empty());
        assert_eq!(updated.updated_by, "test");
    }

    #[test]
    fn update_merges_nested_and_agent_data_fields_without_dropping_them() {
        let mut doc = itinerary();
        let cs = change_set(vec![ChangeOperation::Update {
            id: NodeId::from_string("day1_node1"),
            partial: serde_json::json!({
                "location": { "place_id": "ChIJ123", "user_ratings_total": 42 },
                "timing": { "duration_min": 90 },
                "agent_data": { "enrichment": { "enrichedAt": 100 } },
            }),
        }]);
        execute_ops(&mut doc, &cs, 100, "test").unwrap();
        let updated = doc.days[0].find_node(&NodeId::from_string("day1_node1")).unwrap();
        assert_eq!(updated.location.place_id.as_deref(), Some("ChIJ123"));
        assert_eq!(updated.location.user_ratings_total, Some(42));
        assert_eq!(updated.timing.duration_min, Some(90));
        assert_eq!(
            updated.agent_data.get("enrichment").and_then(|v| v.get("enrichedAt")).and_then(|v| v.as_i64()),
            Some(100)
        );
    }

    #[test]
    fn update_with_mismatched_keys_is_silently_a_noop_on_those_fields() {
        // Regression guard for the patch-shape bug: a flat, wrongly-cased
        // key that doesn't correspond to any `Node` field must not error,
        // but it also must not land anywhere — this documents the
        // behavior so a future flat-key patch is easy to spot in review.
        let mut doc = itinerary();
        let cs = change_set(vec![ChangeOperation::Update {
            id: NodeId::from_string("day1_node1"),
            partial: serde_json::json!({ "placeId": "ChIJ123", "durationMin": 90 }),
        }]);
        execute_ops(&mut doc, &cs, 100, "test").unwrap();
        let updated = doc.days[0].find_node(&NodeId::from_string("day1_node1")).unwrap();
        assert_eq!(updated.location.place_id, None);
        assert_eq!(updated.timing.duration_min, None);
    }

    #[test]
    fn update_edge_upserts_transit() {
        let mut doc = itinerary();
        let cs = change_set(vec![ChangeOperation::UpdateEdge {
            id: None,
            from: Some(NodeId::from_string("day1_node1")),
            to: Some(NodeId::from_string("day1_node2")),
            transit: Some(itin_model::TransitInfo { mode: Some("walk".to_string()), duration_min: Some(10) }),
        }]);
        execute_ops(&mut doc, &cs, 100, "test").unwrap();
        assert_eq!(doc.days[0].edges.len(), 1);
        assert_eq!(doc.days[0].edges[0].transit.as_ref().unwrap().mode, Some("walk".to_string()));
    }

    #[test]
    fn replace_preserves_id_and_locked() {
        let mut doc = itinerary();
        doc.days[0].nodes[0].locked = true;
        let replacement = node("ignored_id");
        let cs = change_set(vec![ChangeOperation::Replace {
            id: NodeId::from_string("day1_node1"),
            node: replacement,
        }]);
        execute_ops(&mut doc, &cs, 100, "test").unwrap();
        let n = &doc.days[0].nodes[0];
        assert_eq!(n.id.as_str(), "day1_node1");
        assert!(n.locked);
    }
}
