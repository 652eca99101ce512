//! Diff computation between two document states.

use std::collections::HashMap;

use itin_model::{Diff, DiffEntry, Itinerary, Node, NodeId};

fn flatten(doc: &Itinerary) -> HashMap<NodeId, (u32, &Node)> {
    let mut map = HashMap::new();
    for day in &doc.days {
        for node in &day.nodes {
            map.insert(node.id.clone(), (day.day_number, node));
        }
    }
    map
}

/// Top-level `Node` fields that differ between two versions of the same
/// id, for the diff's informational `fields` list.
fn changed_fields(old: &Node, new: &Node) -> Vec<String> {
    let old_json = serde_json::to_value(old).unwrap_or_default();
    let new_json = serde_json::to_value(new).unwrap_or_default();
    let (Some(old_obj), Some(new_obj)) = (old_json.as_object(), new_json.as_object()) else {
        return vec![];
    };
    old_obj
        .keys()
        .filter(|k| old_obj.get(*k) != new_obj.get(*k))
        .cloned()
        .collect()
}

/// Compute the added/removed/updated diff between `before` and `after`,
/// tagging it with `to_version`.
#[must_use]
pub fn compute_diff(before: &Itinerary, after: &Itinerary, to_version: u64) -> Diff {
    let old_nodes = flatten(before);
    let new_nodes = flatten(after);

    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut updated = Vec::new();

    for (id, (day, node)) in &new_nodes {
        match old_nodes.get(id) {
            None => added.push(DiffEntry {
                node_id: id.clone(),
                day: *day,
                fields: None,
                title: Some(node.title.clone()),
            }),
            Some((_, old_node)) => {
                let fields = changed_fields(old_node, node);
                if !fields.is_empty() {
                    updated.push(DiffEntry {
                        node_id: id.clone(),
                        day: *day,
                        fields: Some(fields),
                        title: Some(node.title.clone()),
                    });
                }
            }
        }
    }

    for (id, (day, node)) in &old_nodes {
        if !new_nodes.contains_key(id) {
            removed.push(DiffEntry {
                node_id: id.clone(),
                day: *day,
                fields: None,
                title: Some(node.title.clone()),
            });
        }
    }

    Diff { added, removed, updated, to_version }
}
