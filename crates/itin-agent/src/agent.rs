//! The `Agent` contract and its lifecycle wrapper.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use itin_bus::{AgentEvent, AgentEventStatus, AgentKind, BusEvent, EventBus};
use itin_change::ChangeEngine;
use itin_model::{AgentInstanceId, ChangeSet, Diff, ItineraryId};
use itin_providers::{BookingRouter, ModelClient, PaymentGateway, PlacesProvider};
use itin_store::DocumentStore;

use crate::error::AgentError;

/// Soft deadline applied to every agent's `execute` call by [`run`]. An
/// agent that overruns this is failed with [`AgentError::Timeout`] exactly
/// like any other execution error, so the orchestrator's
/// continue-on-non-critical-failure policy needs no special case for
/// timeouts.
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(30);

/// What an agent declares about itself to the registry.
#[derive(Debug, Clone)]
pub struct AgentCapabilities {
    pub supported_tasks: HashSet<String>,
    /// Lower value wins a dispatch tie.
    pub priority: i32,
    pub chat_enabled: bool,
    pub config: serde_json::Value,
}

impl AgentCapabilities {
    #[must_use]
    pub fn new(tasks: impl IntoIterator<Item = &'static str>, priority: i32, chat_enabled: bool) -> Self {
        Self {
            supported_tasks: tasks.into_iter().map(str::to_string).collect(),
            priority,
            chat_enabled,
            config: serde_json::Value::Null,
        }
    }
}

/// Everything an agent body needs to do its job: which document, which
/// task, what the caller sent, and the collaborators it's allowed to
/// touch. `store` is a direct read handle for agents that need to inspect
/// the current document before building a change set; all writes still go
/// exclusively through `change_engine`.
pub struct AgentContext<S: DocumentStore> {
    pub itinerary_id: ItineraryId,
    pub task_type: String,
    pub payload: serde_json::Value,
    pub store: Arc<S>,
    pub change_engine: Arc<ChangeEngine<S>>,
    pub bus: Arc<EventBus>,
    pub model: Arc<dyn ModelClient>,
    pub places: Arc<dyn PlacesProvider>,
    pub booking: Arc<BookingRouter>,
    pub payment: Arc<dyn PaymentGateway>,
}

/// Result of a successful agent execution. Pipeline agents (skeleton,
/// populators, cost, enrichment) write through the change engine
/// themselves and return an empty outcome; chat-facing agents
/// (planner/editor) return the change set they propose so the chat
/// router or orchestrator can decide whether to apply it.
#[derive(Debug, Clone, Default)]
pub struct AgentOutcome {
    pub change_set: Option<ChangeSet>,
    pub diff: Option<Diff>,
    pub message: Option<String>,
    pub warnings: Vec<String>,
}

/// Narrow per-agent contract. No subclassing — capability declaration and
/// the typed execute body are the only things an implementor provides;
/// [`run`] supplies the shared lifecycle around it.
#[async_trait]
pub trait Agent<S: DocumentStore>: Send + Sync {
    fn kind(&self) -> AgentKind;
    fn capabilities(&self) -> &AgentCapabilities;
    async fn execute(&self, ctx: &AgentContext<S>) -> Result<AgentOutcome, AgentError>;
}

/// Resolve the effective task type: the payload's explicit `taskType` if
/// present, else the fallback derived from `kind`.
#[must_use]
pub fn task_type_for(kind: AgentKind, explicit: Option<&str>) -> String {
    if let Some(t) = explicit {
        return t.to_string();
    }
    match kind {
        AgentKind::Booking => "book",
        AgentKind::Editor => "edit",
        AgentKind::Planner => "plan",
        AgentKind::Explainer => "explain",
        AgentKind::Enrichment => "enrich",
        AgentKind::Places => "places",
        AgentKind::Skeleton => "skeleton",
        AgentKind::Activity => "populate_attractions",
        AgentKind::Meal => "populate_meals",
        AgentKind::Transport => "populate_transport",
        AgentKind::Cost => "estimate_costs",
    }
    .to_string()
}

/// The shared lifecycle every agent runs through: `queued` → capability
/// check → `running` → the agent's own body → `completed`/`failed`.
/// Implemented as one free function rather than a base class, since Rust
/// has no subclassing.
pub async fn run<S, A>(agent: &A, ctx: AgentContext<S>) -> Result<AgentOutcome, AgentError>
where
    S: DocumentStore,
    A: Agent<S>,
{
    let agent_id = AgentInstanceId::new().to_string();
    let kind = agent.kind();
    let emit = |status: AgentEventStatus, progress: u8, message: Option<String>, step: Option<String>| {
        ctx.bus.publish(BusEvent::Agent(AgentEvent {
            agent_id: agent_id.clone(),
            agent_kind: kind,
            status,
            progress,
            message,
            step,
            timestamp: chrono::Utc::now().timestamp_millis(),
            itinerary_id: ctx.itinerary_id.clone(),
        }));
    };

    emit(AgentEventStatus::Queued, 0, None, None);

    if !agent.capabilities().supported_tasks.contains(&ctx.task_type) {
        let err = AgentError::CannotHandle(ctx.task_type.clone());
        emit(AgentEventStatus::Failed, 0, Some(err.to_string()), None);
        return Err(err);
    }

    emit(AgentEventStatus::Running, 10, None, None);

    let outcome = match tokio::time::timeout(DEFAULT_AGENT_TIMEOUT, agent.execute(&ctx)).await {
        Ok(result) => result,
        Err(_elapsed) => Err(AgentError::Timeout),
    };

    match outcome {
        Ok(outcome) => {
            emit(AgentEventStatus::Completed, 100, outcome.message.clone(), None);
            Ok(outcome)
        }
        Err(err) => {
            emit(AgentEventStatus::Failed, 0, Some(err.to_string()), None);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_falls_back_by_kind() {
        assert_eq!(task_type_for(AgentKind::Booking, None), "book");
        assert_eq!(task_type_for(AgentKind::Skeleton, None), "skeleton");
        assert_eq!(task_type_for(AgentKind::Booking, Some("custom")), "custom");
    }
}
