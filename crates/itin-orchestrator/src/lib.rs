//! Pipeline composition: the two coarse entry points the rest of the
//! system calls through. `generate` turns a create request into a
//! persisted, fully-populated itinerary by running the agent stage DAG;
//! `edit_via_chat` hands a chat message to the [`itin_chat::ChatRouter`].
//!
//! # Example
//!
//! ```rust,ignore
//! use itin_orchestrator::Orchestrator;
//!
//! let id = orchestrator.generate(req).await?;
//! let response = orchestrator.edit_via_chat(chat_request).await;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod pipeline;

pub use error::OrchestratorError;

use std::sync::Arc;

use itin_agent::AgentRegistry;
use itin_bus::EventBus;
use itin_change::ChangeEngine;
use itin_chat::ChatRouter;
use itin_model::{ChatRequest, ChatResponse, CreateItineraryAck, CreateItineraryReq, ItineraryId};
use itin_providers::{BookingRouter, ModelClient, PaymentGateway, PlacesProvider};
use itin_store::DocumentStore;

use crate::pipeline::{stub_itinerary, StageRunner};

/// Top-level composition root: owns the shared collaborators and exposes
/// `generate`/`edit_via_chat` to whatever transport layer sits in front of
/// it (an HTTP server, a CLI demo, a test harness).
pub struct Orchestrator<S: DocumentStore> {
    store: Arc<S>,
    stage_runner: StageRunner<S>,
    chat_router: ChatRouter<S>,
}

impl<S: DocumentStore + 'static> Orchestrator<S> {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
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
        let stage_runner = StageRunner {
            store: store.clone(),
            change_engine: change_engine.clone(),
            bus: bus.clone(),
            registry: registry.clone(),
            model: model.clone(),
            places: places.clone(),
            booking: booking.clone(),
            payment: payment.clone(),
        };
        let chat_router = ChatRouter::new(store.clone(), change_engine, bus, registry, model, places, booking, payment);
        Self { store, stage_runner, chat_router }
    }

    /// Creates the stub document, seeds the `agents` status map, publishes
    /// a kick-off event, then runs the create pipeline to completion.
    /// Returns the new itinerary's id and status once the pipeline has
    /// run — the populator/enrichment stages may still have logged
    /// non-critical failures; callers inspect `agents` on the persisted
    /// document for per-task detail.
    pub async fn generate(&self, req: CreateItineraryReq) -> Result<CreateItineraryAck, OrchestratorError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        let doc = stub_itinerary(&req, now_ms)?;
        let id = doc.id.clone();

        self.store.set(&id, doc).await.map_err(|e| OrchestratorError::Store(e.to_string()))?;

        self.stage_runner.run_create_pipeline(&id).await?;

        Ok(CreateItineraryAck { id, status: "generated".to_string() })
    }

    /// Delegates to the chat router: classify intent, dispatch, surface a
    /// `ChatResponse`.
    pub async fn edit_via_chat(&self, request: ChatRequest) -> ChatResponse {
        self.chat_router.route(request).await
    }

    /// The itinerary id a generate call produced, for callers that only
    /// have the ack and want the full document.
    pub async fn load(&self, id: &ItineraryId) -> Result<Option<itin_model::Itinerary>, OrchestratorError> {
        self.store.get(id).await.map_err(|e| OrchestratorError::Store(e.to_string()))
    }
}

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
