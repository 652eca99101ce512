//! Planner and editor agents: the two chat-facing agents that turn a
//! natural-language request into a change set. Planner handles whole-day
//! replans, editor handles single-node edits; both share the same
//! summarize/prompt/decode/lock-check pipeline.

use async_trait::async_trait;
use serde_json::{json, Value};

use itin_agent::{Agent, AgentCapabilities, AgentContext, AgentError, AgentOutcome};
use itin_bus::AgentKind;
use itin_decoder::decode;
use itin_model::{ChangeOperation, ChangeSet, Intent, Itinerary, NodeId, Preferences, Scope};
use itin_providers::{CompletionRequest, ModelClient};
use itin_store::DocumentStore;

use crate::util::node_type_label;

const MAX_SUMMARY_CHARS: usize = 8_000;

fn summarize(doc: &Itinerary) -> String {
    let mut summary = String::new();
    for day in &doc.days {
        summary.push_str(&format!("Day {} ({}):\n", day.day_number, day.date));
        for node in &day.nodes {
            summary.push_str(&format!(
                "  - [{}] {} ({}){}\n",
                node.id,
                node.title,
                node_type_label(node.node_type),
                if node.locked { " [locked]" } else { "" }
            ));
        }
    }
    if summary.len() > MAX_SUMMARY_CHARS {
        summary.truncate(MAX_SUMMARY_CHARS);
        summary.push_str("\n...(truncated)");
    }
    summary
}

fn change_set_schema() -> Value {
    json!({
        "type": "object",
        "required": ["ops"],
        "properties": {
            "ops": { "type": "array" },
            "reason": { "type": "string" }
        }
    })
}

/// Shared body for both agents: look up the target node (if any), short
/// circuit with a zero-ops outcome on a lock conflict, otherwise ask the
/// model for a change set and parse its ops.
async fn propose_change<S: DocumentStore>(
    ctx: &AgentContext<S>,
    agent_tag: &str,
) -> Result<AgentOutcome, AgentError> {
    let doc = ctx
        .store
        .get(&ctx.itinerary_id)
        .await
        .map_err(|e| AgentError::Other(e.to_string()))?
        .ok_or_else(|| AgentError::Other("itinerary not found".to_string()))?;

    let message = ctx.payload.get("message").and_then(Value::as_str).unwrap_or("");
    let target_node_id = ctx.payload.get("targetNodeId").and_then(Value::as_str).map(NodeId::from_string);

    if let Some(target) = &target_node_id {
        let locked = doc.days.iter().find_map(|d| d.find_node(target)).is_some_and(|n| n.locked);
        if locked {
            return Ok(AgentOutcome {
                change_set: None,
                diff: None,
                message: Some(format!("{target} is locked and can't be changed this way.")),
                warnings: vec![format!("lock conflict on {target}")],
            });
        }
    }

    let day_number = ctx
        .payload
        .get("day")
        .and_then(Value::as_u64)
        .map(|d| d as u32)
        .or_else(|| target_node_id.as_ref().and_then(|id| doc.day_containing(id)));
    let day_date = day_number.and_then(|d| doc.find_day(d)).map(|d| d.date.clone());

    let schema = change_set_schema();
    let prompt = format!(
        "You are editing a travel itinerary for {}. Current state:\n{}\n\nUser request: {message}\n\n\
         Respond with JSON: {{\"ops\": [...], \"reason\": \"...\"}} using the change-set operation \
         vocabulary (insert, delete, move, replace, update, update_edge).",
        doc.destination,
        summarize(&doc),
    );

    let response = ctx
        .model
        .complete(CompletionRequest { prompt: prompt.clone(), schema: Some(schema.clone()) })
        .await
        .map_err(|e| AgentError::Model(e.to_string()))?;

    let outcome = decode(&*ctx.model, &prompt, &schema, &response.text, day_date.as_deref()).await;
    if !outcome.ok {
        return Err(AgentError::Model(outcome.errors.join("; ")));
    }
    let data = outcome.data.unwrap_or(Value::Null);

    let raw_ops = data.get("ops").and_then(Value::as_array).cloned().unwrap_or_default();
    let mut ops = Vec::new();
    let mut warnings = Vec::new();
    for raw_op in raw_ops {
        match serde_json::from_value::<ChangeOperation>(raw_op) {
            Ok(op) => ops.push(op),
            Err(err) => warnings.push(format!("dropped unparseable op: {err}")),
        }
    }

    if ops.is_empty() {
        return Ok(AgentOutcome {
            change_set: None,
            diff: None,
            message: Some("I couldn't work out a concrete change from that.".to_string()),
            warnings,
        });
    }

    let reason = data.get("reason").and_then(Value::as_str).map(str::to_string);
    let change_set = ChangeSet {
        scope: if day_number.is_some() { Scope::Day } else { Scope::Trip },
        day: day_number,
        base_version: Some(doc.version),
        idempotency_key: None,
        ops,
        preferences: Preferences { user_first: true, respect_locks: true, auto_apply: false },
        reason: reason.clone(),
        agent: agent_tag.to_string(),
    };

    Ok(AgentOutcome { change_set: Some(change_set), diff: None, message: reason, warnings })
}

/// Whole-day replans driven by chat (`REPLAN_TODAY`).
pub struct PlannerAgent {
    caps: AgentCapabilities,
}

impl PlannerAgent {
    #[must_use]
    pub fn new() -> Self {
        Self { caps: AgentCapabilities::new(["plan"], 5, true) }
    }
}

impl Default for PlannerAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: DocumentStore> Agent<S> for PlannerAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Planner
    }

    fn capabilities(&self) -> &AgentCapabilities {
        &self.caps
    }

    async fn execute(&self, ctx: &AgentContext<S>) -> Result<AgentOutcome, AgentError> {
        propose_change(ctx, "planner").await
    }
}

/// Targeted single-node edits driven by chat (move/insert/delete/replace).
pub struct EditorAgent {
    caps: AgentCapabilities,
}

impl EditorAgent {
    #[must_use]
    pub fn new() -> Self {
        Self { caps: AgentCapabilities::new(["edit"], 5, true) }
    }
}

impl Default for EditorAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: DocumentStore> Agent<S> for EditorAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Editor
    }

    fn capabilities(&self) -> &AgentCapabilities {
        &self.caps
    }

    async fn execute(&self, ctx: &AgentContext<S>) -> Result<AgentOutcome, AgentError> {
        propose_change(ctx, "editor").await
    }
}

fn intent_schema() -> Value {
    json!({
        "type": "object",
        "required": ["intent"],
        "properties": {
            "intent": {
                "type": "string",
                "enum": [
                    "REPLAN_TODAY", "MOVE_TIME", "INSERT_PLACE", "DELETE_NODE", "REPLACE_NODE",
                    "BOOK_NODE", "UNDO", "EXPLAIN", "DISAMBIGUATION", "UNKNOWN", "ERROR"
                ]
            }
        }
    })
}

fn parse_intent(value: &str) -> Intent {
    match value {
        "REPLAN_TODAY" => Intent::ReplanToday,
        "MOVE_TIME" => Intent::MoveTime,
        "INSERT_PLACE" => Intent::InsertPlace,
        "DELETE_NODE" => Intent::DeleteNode,
        "REPLACE_NODE" => Intent::ReplaceNode,
        "BOOK_NODE" => Intent::BookNode,
        "UNDO" => Intent::Undo,
        "EXPLAIN" => Intent::Explain,
        "DISAMBIGUATION" => Intent::Disambiguation,
        _ => Intent::Unknown,
    }
}

/// Classifies a chat message into one top-level [`Intent`] with a single
/// model call. Delegated to the editor's model collaborator rather than
/// the `Agent` trait, since classification never touches the document and
/// has no change-set output to route through `run`.
pub async fn classify_intent(model: &dyn ModelClient, message: &str) -> Intent {
    let schema = intent_schema();
    let prompt = format!(
        "Classify this itinerary chat message into exactly one intent: \"{message}\". \
         Respond with JSON: {{\"intent\": \"...\"}}."
    );
    let response = match model.complete(CompletionRequest { prompt: prompt.clone(), schema: Some(schema.clone()) }).await {
        Ok(response) => response,
        Err(_) => return Intent::Error,
    };
    let outcome = decode(model, &prompt, &schema, &response.text, None).await;
    if !outcome.ok {
        return Intent::Error;
    }
    match outcome.data.and_then(|v| v.get("intent").and_then(Value::as_str).map(str::to_string)) {
        Some(value) => parse_intent(&value),
        None => Intent::Unknown,
    }
}
