//! The create-itinerary pipeline: stub document, then the stage DAG
//! `Skeleton -> (Activity || Meal || Transport) -> Cost -> Enrichment`.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde_json::json;
use tracing::warn;

use itin_agent::{run, AgentContext, AgentRegistry};
use itin_bus::{AgentEvent, AgentEventStatus, AgentKind, BusEvent, EventBus};
use itin_change::ChangeEngine;
use itin_model::{
    AgentState, AgentStatusRecord, CreateItineraryReq, Day, ItineraryId, Itinerary, Settings,
};
use itin_providers::{BookingRouter, ModelClient, PaymentGateway, PlacesProvider};
use itin_store::DocumentStore;

use crate::error::OrchestratorError;

/// Stages run in order; the three populators within the second stage run
/// concurrently against each other.
const PIPELINE_TASKS: [&str; 3] = ["skeleton", "estimate_costs", "enrich"];
const POPULATOR_TASKS: [&str; 3] = ["populate_attractions", "populate_meals", "populate_transport"];

fn parse_date(raw: &str) -> Result<NaiveDate, OrchestratorError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| OrchestratorError::InvalidRequest(format!("invalid date: {raw}")))
}

/// Builds the stub document: one empty [`Day`] per calendar day between
/// `start_date` and `end_date` inclusive, no nodes yet. The skeleton agent
/// is the one that fills `days[i].nodes`.
pub fn stub_itinerary(req: &CreateItineraryReq, now_ms: i64) -> Result<Itinerary, OrchestratorError> {
    if req.duration_days == 0 {
        return Err(OrchestratorError::InvalidRequest("duration_days must be at least 1".to_string()));
    }
    let start = parse_date(&req.start_date)?;
    let end = parse_date(&req.end_date)?;
    if end < start {
        return Err(OrchestratorError::InvalidRequest("end_date is before start_date".to_string()));
    }

    let days = (0..req.duration_days)
        .map(|i| {
            let date = start + Duration::days(i64::from(i));
            Day {
                day_number: i + 1,
                date: date.format("%Y-%m-%d").to_string(),
                location: None,
                summary: None,
                total_cost: None,
                nodes: vec![],
                edges: vec![],
            }
        })
        .collect();

    let mut agents = HashMap::new();
    for task in PIPELINE_TASKS.iter().chain(POPULATOR_TASKS.iter()) {
        agents.insert(
            (*task).to_string(),
            AgentStatusRecord { state: AgentState::Queued, progress: 0, message: None, step: None, updated_at: now_ms },
        );
    }

    Ok(Itinerary {
        id: ItineraryId::new(),
        version: 1,
        user_id: req.user_id.clone(),
        destination: req.destination.clone(),
        start_date: req.start_date.clone(),
        end_date: end.format("%Y-%m-%d").to_string(),
        themes: req.interests.clone(),
        currency: "USD".to_string(),
        budget_tier: req.budget_tier,
        days,
        settings: Settings::default(),
        agents,
        created_at: now_ms,
        updated_at: now_ms,
    })
}

/// Everything a pipeline stage needs to dispatch and run one agent.
pub struct StageRunner<S: DocumentStore> {
    pub store: Arc<S>,
    pub change_engine: Arc<ChangeEngine<S>>,
    pub bus: Arc<EventBus>,
    pub registry: Arc<AgentRegistry<S>>,
    pub model: Arc<dyn ModelClient>,
    pub places: Arc<dyn PlacesProvider>,
    pub booking: Arc<BookingRouter>,
    pub payment: Arc<dyn PaymentGateway>,
}

impl<S: DocumentStore + 'static> StageRunner<S> {
    fn context_for(&self, itinerary_id: ItineraryId, task_type: &str) -> AgentContext<S> {
        AgentContext {
            itinerary_id,
            task_type: task_type.to_string(),
            payload: json!({}),
            store: self.store.clone(),
            change_engine: self.change_engine.clone(),
            bus: self.bus.clone(),
            model: self.model.clone(),
            places: self.places.clone(),
            booking: self.booking.clone(),
            payment: self.payment.clone(),
        }
    }

    /// Runs one task to completion against the document's current state.
    /// Pipeline agents write through the change engine themselves; the
    /// stub outcome this returns carries only diagnostics.
    async fn run_task(&self, id: &ItineraryId, task: &'static str) -> Result<(), String> {
        let Some(agent) = self.registry.dispatch(task) else {
            return Err(format!("no agent registered for {task}"));
        };
        let ctx = self.context_for(id.clone(), task);
        match run(agent.as_ref(), ctx).await {
            Ok(_) => Ok(()),
            Err(err) => Err(err.to_string()),
        }
    }

    /// Runs the skeleton stage; its failure aborts the whole pipeline
    /// per the crash/retry policy.
    async fn run_skeleton(&self, id: &ItineraryId) -> Result<(), OrchestratorError> {
        self.run_task(id, "skeleton").await.map_err(OrchestratorError::SkeletonFailed)
    }

    /// Runs a non-critical stage: failures are logged and swallowed so the
    /// pipeline keeps going rather than aborting the whole create flow for
    /// a populator or enrichment hiccup.
    async fn run_noncritical(&self, id: &ItineraryId, task: &'static str) {
        if let Err(message) = self.run_task(id, task).await {
            warn!(itinerary_id = %id, task, error = %message, "non-critical pipeline stage failed");
        }
    }

    fn emit_kickoff(&self, id: &ItineraryId) {
        self.bus.publish(BusEvent::Agent(AgentEvent {
            agent_id: "orchestrator".to_string(),
            agent_kind: AgentKind::Skeleton,
            status: AgentEventStatus::Queued,
            progress: 0,
            message: Some("generation started".to_string()),
            step: Some("kickoff".to_string()),
            timestamp: chrono::Utc::now().timestamp_millis(),
            itinerary_id: id.clone(),
        }));
    }

    /// Runs the full create pipeline against an already-persisted stub
    /// document: `Skeleton -> (Activity || Meal || Transport) -> Cost ->
    /// Enrichment`. Each stage re-loads the document from the store rather
    /// than threading working memory between agents, so every agent always
    /// sees the latest committed state.
    pub async fn run_create_pipeline(&self, id: &ItineraryId) -> Result<(), OrchestratorError> {
        self.emit_kickoff(id);

        self.run_skeleton(id).await?;

        tokio::join!(
            self.run_noncritical(id, "populate_attractions"),
            self.run_noncritical(id, "populate_meals"),
            self.run_noncritical(id, "populate_transport"),
        );

        self.run_noncritical(id, "estimate_costs").await;
        self.run_noncritical(id, "enrich").await;

        Ok(())
    }
}
