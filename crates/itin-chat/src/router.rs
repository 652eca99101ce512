//! Chat router: classifies a free-form message into one [`Intent`], then
//! dispatches to the change engine directly (undo), a read-only agent
//! (explain), a committing agent (book), or a change-set-producing agent
//! (planner/editor) whose proposal is previewed and optionally applied.

use std::sync::Arc;

use regex::Regex;
use serde_json::{json, Value};

use itin_agent::{run, AgentContext, AgentRegistry};
use itin_agents::classify_intent;
use itin_bus::EventBus;
use itin_change::ChangeEngine;
use itin_model::{ChatRequest, ChatResponse, Intent, Itinerary, ItineraryId, NodeId, NodeType};
use itin_providers::{BookingRouter, ModelClient, PaymentGateway, PlacesProvider};
use itin_store::DocumentStore;

use crate::candidates::find_candidates;

fn node_ref_pattern() -> Regex {
    // Matches the skeleton id convention `dayK_nodeN` anywhere in the
    // message text.
    Regex::new(r"day\d+_node\d+").expect("constant pattern is valid")
}

fn booking_type_for(node_type: NodeType) -> &'static str {
    match node_type {
        NodeType::Accommodation => "hotel",
        NodeType::Transport => "flight",
        NodeType::Attraction | NodeType::Meal => "activity",
    }
}

/// The chat-to-change pipeline. One instance is shared across all
/// itineraries; dispatch is always itinerary-scoped through the request.
pub struct ChatRouter<S: DocumentStore> {
    store: Arc<S>,
    change_engine: Arc<ChangeEngine<S>>,
    bus: Arc<EventBus>,
    registry: Arc<AgentRegistry<S>>,
    model: Arc<dyn ModelClient>,
    places: Arc<dyn PlacesProvider>,
    booking: Arc<BookingRouter>,
    payment: Arc<dyn PaymentGateway>,
}

impl<S: DocumentStore + 'static> ChatRouter<S> {
    #[must_use]
    pub fn new(
        store: Arc<S>,
        change_engine: Arc<ChangeEngine<S>>,
        bus: Arc<EventBus>,
        registry: Arc<AgentRegistry<S>>,
        model: Arc<dyn ModelClient>,
        places: Arc<dyn PlacesProvider>,
        booking: Arc<BookingRouter>,
        payment: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self { store, change_engine, bus, registry, model, places, booking, payment }
    }

    fn context_for(&self, itinerary_id: ItineraryId, task_type: &str, payload: Value) -> AgentContext<S> {
        AgentContext {
            itinerary_id,
            task_type: task_type.to_string(),
            payload,
            store: self.store.clone(),
            change_engine: self.change_engine.clone(),
            bus: self.bus.clone(),
            model: self.model.clone(),
            places: self.places.clone(),
            booking: self.booking.clone(),
            payment: self.payment.clone(),
        }
    }

    async fn load(&self, id: &ItineraryId) -> Result<Itinerary, String> {
        self.store
            .get(id)
            .await
            .map_err(|e| e.to_string())?
            .ok_or_else(|| "this itinerary could not be found".to_string())
    }

    /// Classify the message and dispatch to the matching handler.
    pub async fn route(&self, request: ChatRequest) -> ChatResponse {
        let intent = classify_intent(&*self.model, &request.message).await;
        match intent {
            Intent::Error => error_response(vec!["I couldn't understand that — try rephrasing.".to_string()]),
            Intent::Undo => self.handle_undo(&request).await,
            Intent::Explain => self.handle_explain(&request).await,
            Intent::BookNode => self.handle_book(&request).await,
            Intent::Disambiguation => self.handle_disambiguation(&request).await,
            other => self.handle_change(other, &request).await,
        }
    }

    async fn handle_undo(&self, request: &ChatRequest) -> ChatResponse {
        match self.change_engine.undo(&request.itinerary_id, "chat").await {
            Ok(result) => ChatResponse {
                intent: Intent::Undo,
                message: "Undid the last change.".to_string(),
                change_set: None,
                diff: Some(result.diff),
                applied: true,
                to_version: Some(result.itinerary.version),
                warnings: vec![],
                needs_disambiguation: false,
                candidates: vec![],
                errors: vec![],
            },
            Err(err) => error_response(vec![err.kind().to_string()]),
        }
    }

    async fn handle_explain(&self, request: &ChatRequest) -> ChatResponse {
        let Some(agent) = self.registry.dispatch_chat("explain") else {
            return error_response(vec!["No explainer agent is registered.".to_string()]);
        };
        let ctx = self.context_for(
            request.itinerary_id.clone(),
            "explain",
            json!({ "message": request.message }),
        );
        match run(agent.as_ref(), ctx).await {
            Ok(outcome) => ChatResponse {
                intent: Intent::Explain,
                message: outcome.message.unwrap_or_default(),
                change_set: None,
                diff: None,
                applied: false,
                to_version: None,
                warnings: outcome.warnings,
                needs_disambiguation: false,
                candidates: vec![],
                errors: vec![],
            },
            Err(err) => error_response(vec![err.kind().to_string()]),
        }
    }

    async fn handle_book(&self, request: &ChatRequest) -> ChatResponse {
        let doc = match self.load(&request.itinerary_id).await {
            Ok(doc) => doc,
            Err(message) => return error_response(vec![message]),
        };

        if let Some(mat) = node_ref_pattern().find(&request.message) {
            let node_id = NodeId::from_string(mat.as_str());
            let found = doc.days.iter().find_map(|d| d.find_node(&node_id));
            if let Some(node) = found {
                let Some(agent) = self.registry.dispatch_chat("book") else {
                    return error_response(vec!["No booking agent is registered.".to_string()]);
                };
                let payload = json!({
                    "nodeId": node_id.to_string(),
                    "bookingType": booking_type_for(node.node_type),
                    "amount": node.cost.amount.unwrap_or(0),
                    "currency": node.cost.currency.clone().unwrap_or_else(|| doc.currency.clone()),
                    "details": {},
                });
                let ctx = self.context_for(request.itinerary_id.clone(), "book", payload);
                return match run(agent.as_ref(), ctx).await {
                    Ok(outcome) => ChatResponse {
                        intent: Intent::BookNode,
                        message: outcome.message.unwrap_or_default(),
                        change_set: None,
                        diff: None,
                        applied: true,
                        to_version: None,
                        warnings: outcome.warnings,
                        needs_disambiguation: false,
                        candidates: vec![],
                        errors: vec![],
                    },
                    Err(err) => error_response(vec![err.kind().to_string()]),
                };
            }
        }

        let candidates = find_candidates(&doc, &request.message);
        if candidates.is_empty() {
            return error_response(vec![
                "I couldn't find anything to book from that — try naming the place.".to_string(),
            ]);
        }
        ChatResponse {
            intent: Intent::Disambiguation,
            message: "Which item would you like to book?".to_string(),
            change_set: None,
            diff: None,
            applied: false,
            to_version: None,
            warnings: vec![],
            needs_disambiguation: true,
            candidates,
            errors: vec![],
        }
    }

    async fn handle_disambiguation(&self, request: &ChatRequest) -> ChatResponse {
        let doc = match self.load(&request.itinerary_id).await {
            Ok(doc) => doc,
            Err(message) => return error_response(vec![message]),
        };
        let candidates = find_candidates(&doc, &request.message);
        ChatResponse {
            intent: Intent::Disambiguation,
            message: if candidates.is_empty() {
                "I'm not sure which item you mean — could you be more specific?".to_string()
            } else {
                "Which one did you mean?".to_string()
            },
            change_set: None,
            diff: None,
            applied: false,
            to_version: None,
            warnings: vec![],
            needs_disambiguation: true,
            candidates,
            errors: vec![],
        }
    }

    /// `REPLAN_TODAY` goes to the planner; every other non-special intent
    /// (`MOVE_TIME`, `INSERT_PLACE`, `DELETE_NODE`, `REPLACE_NODE`,
    /// `UNKNOWN`) goes to the editor.
    async fn handle_change(&self, intent: Intent, request: &ChatRequest) -> ChatResponse {
        let task_type = if matches!(intent, Intent::ReplanToday) { "plan" } else { "edit" };
        let Some(agent) = self.registry.dispatch_chat(task_type) else {
            return error_response(vec![format!("No agent is registered for {task_type}.")]);
        };
        let ctx = self.context_for(
            request.itinerary_id.clone(),
            task_type,
            json!({ "message": request.message }),
        );

        let outcome = match run(agent.as_ref(), ctx).await {
            Ok(outcome) => outcome,
            Err(err) => return error_response(vec![err.kind().to_string()]),
        };

        let Some(change_set) = outcome.change_set else {
            // Lock conflict or an unparseable model response: the agent
            // already degraded to a zero-ops outcome with an explanation.
            return ChatResponse {
                intent,
                message: outcome.message.unwrap_or_default(),
                change_set: None,
                diff: None,
                applied: false,
                to_version: None,
                warnings: outcome.warnings,
                needs_disambiguation: false,
                candidates: vec![],
                errors: vec![],
            };
        };

        let proposal = match self.change_engine.propose(&request.itinerary_id, &change_set).await {
            Ok(proposal) => proposal,
            Err(err) => return error_response(vec![err.kind().to_string()]),
        };

        if request.auto_apply {
            match self.change_engine.apply(&request.itinerary_id, change_set.clone()).await {
                Ok(applied) => ChatResponse {
                    intent,
                    message: outcome.message.unwrap_or_default(),
                    change_set: Some(change_set),
                    diff: Some(applied.diff),
                    applied: true,
                    to_version: Some(applied.itinerary.version),
                    warnings: outcome.warnings,
                    needs_disambiguation: false,
                    candidates: vec![],
                    errors: vec![],
                },
                Err(err) => error_response(vec![err.kind().to_string()]),
            }
        } else {
            ChatResponse {
                intent,
                message: outcome.message.unwrap_or_default(),
                change_set: Some(change_set),
                diff: Some(proposal.diff),
                applied: false,
                to_version: Some(proposal.itinerary.version),
                warnings: outcome.warnings,
                needs_disambiguation: false,
                candidates: vec![],
                errors: vec![],
            }
        }
    }
}

fn error_response(errors: Vec<String>) -> ChatResponse {
    ChatResponse {
        intent: Intent::Error,
        message: errors.first().cloned().unwrap_or_default(),
        change_set: None,
        diff: None,
        applied: false,
        to_version: None,
        warnings: vec![],
        needs_disambiguation: false,
        candidates: vec![],
        errors,
    }
}
