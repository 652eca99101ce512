//! Activity/meal/transport populators: each replaces placeholder nodes of
//! one `NodeType` with model-generated content, reusing the placeholder's
//! id so downstream references (edges, locks, chat history) never dangle.

use async_trait::async_trait;
use serde_json::{json, Value};

use itin_agent::{Agent, AgentCapabilities, AgentContext, AgentError, AgentOutcome};
use itin_bus::AgentKind;
use itin_decoder::decode;
use itin_model::{ChangeOperation, ChangeSet, Node, NodeType, Preferences, Scope};
use itin_providers::CompletionRequest;
use itin_store::DocumentStore;

use crate::util::node_type_label;

fn batch_schema(node_type: NodeType) -> Value {
    let mut properties = json!({
        "id": { "type": "string" },
        "title": { "type": "string" },
        "description": { "type": "string" },
        "category": { "type": "string" },
        "address": { "type": "string" },
        "startTime": {},
        "endTime": {},
        "durationMin": { "type": "number" }
    });
    // Per-type fields §4.3 requires: meal cuisine/mealType, transport mode.
    let props = properties.as_object_mut().expect("object literal");
    match node_type {
        NodeType::Meal => {
            props.insert("cuisine".to_string(), json!({ "type": "string" }));
            props.insert("mealType".to_string(), json!({ "type": "string" }));
        }
        NodeType::Transport => {
            props.insert("mode".to_string(), json!({ "type": "string" }));
        }
        NodeType::Attraction | NodeType::Accommodation => {}
    }

    json!({
        "type": "object",
        "required": ["nodes"],
        "properties": {
            "nodes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["id", "title"],
                    "properties": properties
                }
            }
        }
    })
}

fn prompt_for(destination: &str, day_date: &str, node_type: NodeType, placeholders: &[&Node]) -> String {
    let label = node_type_label(node_type);
    let ids: Vec<&str> = placeholders.iter().map(|n| n.id.as_str()).collect();
    let type_specific = match node_type {
        NodeType::Meal => " Also include \"cuisine\" and \"mealType\" for each.",
        NodeType::Transport => " Also include \"mode\" for each.",
        NodeType::Attraction | NodeType::Accommodation => "",
    };
    format!(
        "Replace these {label} placeholders for a trip to {destination} on {day_date}. \
         Return JSON matching the schema, one object per id, reusing each id verbatim: {ids:?}.{type_specific}"
    )
}

/// Maps the model's flat, schema-shaped fields onto `Node`'s own nested,
/// snake_case structure. The `Update` partial is deep-merged straight onto
/// `serde_json::to_value(&node)` in the change engine, so a flat
/// `"durationMin"` key (say) never reaches `node.timing.duration_min` —
/// it just gets dropped when the merged value is deserialized back.
fn apply_patch(node: &Node, node_type: NodeType, patch: &Value) -> ChangeOperation {
    let mut nested = serde_json::Map::new();
    if let Some(v) = patch.get("title") {
        nested.insert("title".to_string(), v.clone());
    }

    let mut timing = serde_json::Map::new();
    if let Some(v) = patch.get("startTime") {
        timing.insert("start_time".to_string(), v.clone());
    }
    if let Some(v) = patch.get("endTime") {
        timing.insert("end_time".to_string(), v.clone());
    }
    if let Some(v) = patch.get("durationMin") {
        timing.insert("duration_min".to_string(), v.clone());
    }
    if !timing.is_empty() {
        nested.insert("timing".to_string(), Value::Object(timing));
    }

    let mut location = serde_json::Map::new();
    if let Some(v) = patch.get("address") {
        location.insert("address".to_string(), v.clone());
    }
    if !location.is_empty() {
        nested.insert("location".to_string(), Value::Object(location));
    }

    let mut details = serde_json::Map::new();
    if let Some(v) = patch.get("description") {
        details.insert("description".to_string(), v.clone());
    }
    if let Some(v) = patch.get("category") {
        details.insert("category".to_string(), v.clone());
    }
    if !details.is_empty() {
        nested.insert("details".to_string(), Value::Object(details));
    }

    // Type-specific fields have no dedicated Node column; they live under
    // the open-ended `agent_data` map, keyed by concern, same as
    // enrichment's own extras.
    let mut populator_data = serde_json::Map::new();
    match node_type {
        NodeType::Meal => {
            if let Some(v) = patch.get("cuisine") {
                populator_data.insert("cuisine".to_string(), v.clone());
            }
            if let Some(v) = patch.get("mealType") {
                populator_data.insert("meal_type".to_string(), v.clone());
            }
        }
        NodeType::Transport => {
            if let Some(v) = patch.get("mode") {
                populator_data.insert("mode".to_string(), v.clone());
            }
        }
        NodeType::Attraction | NodeType::Accommodation => {}
    }
    if !populator_data.is_empty() {
        nested.insert("agent_data".to_string(), json!({ "populator": populator_data }));
    }

    ChangeOperation::Update { id: node.id.clone(), partial: Value::Object(nested) }
}

/// Runs a single populate pass for `node_type` against every placeholder
/// node of that type across the document. Shared by the three
/// per-category agents below; they differ only in which `NodeType` and
/// task name they claim.
async fn populate<S: DocumentStore>(
    ctx: &AgentContext<S>,
    node_type: NodeType,
) -> Result<AgentOutcome, AgentError> {
    let doc = ctx
        .store
        .get(&ctx.itinerary_id)
        .await
        .map_err(|e| AgentError::Other(e.to_string()))?
        .ok_or_else(|| AgentError::Other("itinerary not found".to_string()))?;

    let mut warnings = Vec::new();
    let mut populated = 0usize;

    for day in &doc.days {
        let placeholders: Vec<&Node> = day
            .nodes
            .iter()
            .filter(|n| n.node_type == node_type && n.looks_like_placeholder())
            .collect();
        if placeholders.is_empty() {
            continue;
        }

        let schema = batch_schema(node_type);
        let prompt = prompt_for(&doc.destination, &day.date, node_type, &placeholders);
        let response = match ctx.model.complete(CompletionRequest { prompt: prompt.clone(), schema: Some(schema.clone()) }).await {
            Ok(response) => response,
            Err(err) => {
                // Graceful degradation: keep the skeleton placeholders and
                // let a later run retry.
                warnings.push(format!("day {} {} population skipped: {err}", day.day_number, node_type_label(node_type)));
                continue;
            }
        };

        let outcome = decode(&*ctx.model, &prompt, &schema, &response.text, Some(&day.date)).await;
        if !outcome.ok {
            warnings.push(format!(
                "day {} {} population unparseable: {}",
                day.day_number,
                node_type_label(node_type),
                outcome.errors.join("; ")
            ));
            continue;
        }

        let Some(Value::Array(returned)) = outcome.data.and_then(|v| v.get("nodes").cloned()) else {
            warnings.push(format!("day {} {} response had no nodes array", day.day_number, node_type_label(node_type)));
            continue;
        };

        let mut ops = Vec::new();
        for patch in &returned {
            let Some(id) = patch.get("id").and_then(Value::as_str) else { continue };
            let Some(node) = placeholders.iter().find(|n| n.id.as_str() == id) else { continue };
            ops.push(apply_patch(node, node_type, patch));
        }
        if ops.is_empty() {
            continue;
        }

        let change_set = ChangeSet {
            scope: Scope::Day,
            day: Some(day.day_number),
            base_version: None,
            idempotency_key: None,
            ops,
            preferences: Preferences { user_first: false, respect_locks: true, auto_apply: true },
            reason: Some(format!("{} population for day {}", node_type_label(node_type), day.day_number)),
            agent: node_type_label(node_type).to_string(),
        };
        ctx.change_engine.apply(&ctx.itinerary_id, change_set).await?;
        populated += 1;
    }

    Ok(AgentOutcome {
        message: Some(format!("populated {populated} day(s) of {}", node_type_label(node_type))),
        warnings,
        ..Default::default()
    })
}

macro_rules! populator_agent {
    ($name:ident, $kind:expr, $task:expr, $node_type:expr) => {
        #[doc = concat!("Replaces ", $task, " placeholders with model-generated content.")]
        pub struct $name {
            caps: AgentCapabilities,
        }

        impl $name {
            #[must_use]
            pub fn new() -> Self {
                Self { caps: AgentCapabilities::new([$task], 10, false) }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        #[async_trait]
        impl<S: DocumentStore> Agent<S> for $name {
            fn kind(&self) -> AgentKind {
                $kind
            }

            fn capabilities(&self) -> &AgentCapabilities {
                &self.caps
            }

            async fn execute(&self, ctx: &AgentContext<S>) -> Result<AgentOutcome, AgentError> {
                populate(ctx, $node_type).await
            }
        }
    };
}

populator_agent!(ActivityAgent, AgentKind::Activity, "populate_attractions", NodeType::Attraction);
populator_agent!(MealAgent, AgentKind::Meal, "populate_meals", NodeType::Meal);
populator_agent!(TransportAgent, AgentKind::Transport, "populate_transport", NodeType::Transport);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_type_labels_match_task_vocabulary() {
        assert_eq!(node_type_label(NodeType::Attraction), "attraction");
        assert_eq!(node_type_label(NodeType::Meal), "meal");
        assert_eq!(node_type_label(NodeType::Transport), "transport");
    }

    #[test]
    fn batch_schema_requires_nodes_array() {
        let schema = batch_schema(NodeType::Attraction);
        assert_eq!(schema["required"][0], "nodes");
    }

    #[test]
    fn meal_schema_requests_cuisine_and_meal_type() {
        let schema = batch_schema(NodeType::Meal);
        let props = &schema["properties"]["nodes"]["items"]["properties"];
        assert!(props.get("cuisine").is_some());
        assert!(props.get("mealType").is_some());
    }

    #[test]
    fn transport_schema_requests_mode() {
        let schema = batch_schema(NodeType::Transport);
        let props = &schema["properties"]["nodes"]["items"]["properties"];
        assert!(props.get("mode").is_some());
    }

    fn sample_node(node_type: NodeType) -> Node {
        Node {
            id: itin_model::NodeId::from_string("day1_node1"),
            node_type,
            title: "Morning Activity".to_string(),
            location: itin_model::Location::default(),
            timing: itin_model::Timing::default(),
            cost: itin_model::Cost::default(),
            details: itin_model::Details::default(),
            labels: vec![],
            tips: itin_model::Tips::default(),
            links: itin_model::Links::default(),
            locked: false,
            status: itin_model::NodeStatus::Planned,
            updated_by: "skeleton".to_string(),
            updated_at: 0,
            agent_data: std::collections::HashMap::new(),
        }
    }

    #[test]
    fn apply_patch_nests_flat_fields_onto_the_node_shape() {
        let node = sample_node(NodeType::Attraction);
        let patch = json!({
            "id": "day1_node1",
            "title": "Senso-ji Temple",
            "description": "Historic Buddhist temple",
            "category": "temple",
            "address": "2 Chome Asakusa",
            "durationMin": 90,
        });
        let op = apply_patch(&node, NodeType::Attraction, &patch);
        let ChangeOperation::Update { partial, .. } = op else { panic!("expected Update") };
        assert_eq!(partial["title"], "Senso-ji Temple");
        assert_eq!(partial["details"]["description"], "Historic Buddhist temple");
        assert_eq!(partial["details"]["category"], "temple");
        assert_eq!(partial["location"]["address"], "2 Chome Asakusa");
        assert_eq!(partial["timing"]["duration_min"], 90);
        assert!(partial.get("durationMin").is_none());
        assert!(partial.get("description").is_none());
    }

    #[test]
    fn apply_patch_stashes_meal_fields_under_agent_data() {
        let node = sample_node(NodeType::Meal);
        let patch = json!({
            "id": "day1_node1",
            "title": "Sushi Dinner",
            "cuisine": "Japanese",
            "mealType": "dinner",
        });
        let op = apply_patch(&node, NodeType::Meal, &patch);
        let ChangeOperation::Update { partial, .. } = op else { panic!("expected Update") };
        assert_eq!(partial["agent_data"]["populator"]["cuisine"], "Japanese");
        assert_eq!(partial["agent_data"]["populator"]["meal_type"], "dinner");
    }

    #[test]
    fn apply_patch_stashes_transport_mode_under_agent_data() {
        let node = sample_node(NodeType::Transport);
        let patch = json!({ "id": "day1_node1", "title": "Train to Asakusa", "mode": "train" });
        let op = apply_patch(&node, NodeType::Transport, &patch);
        let ChangeOperation::Update { partial, .. } = op else { panic!("expected Update") };
        assert_eq!(partial["agent_data"]["populator"]["mode"], "train");
    }
}
