//! Assembles the fixed-fake collaborators and builds an
//! [`itin_orchestrator::Orchestrator`] over an in-memory document store.
//! A future transport layer swaps these constructors for real network
//! clients without touching the orchestrator or agents.

use std::sync::Arc;

use async_trait::async_trait;

use itin_agents::register_all;
use itin_bus::EventBus;
use itin_change::ChangeEngine;
use itin_idempotency::IdempotencyCache;
use itin_orchestrator::Orchestrator;
use itin_providers::{
    BookingRouter, FixedModelClient, FixedPlacesProvider, ModelClient, PaymentError, PaymentGateway,
    PaymentReceipt, PaymentRequest, PlaceDetails, PlacesProvider,
};
use itin_store::InMemoryStore;

use crate::config::KernelConfig;

/// Always declines, since this build wires no real payment processor.
struct DecliningPaymentGateway;

#[async_trait]
impl PaymentGateway for DecliningPaymentGateway {
    async fn charge(&self, _request: PaymentRequest) -> Result<PaymentReceipt, PaymentError> {
        Err(PaymentError::Failed("no payment gateway is configured for this deployment".to_string()))
    }

    async fn refund(&self, _transaction_id: &str) -> Result<(), PaymentError> {
        Ok(())
    }
}

/// Builds an [`Orchestrator`] wired to the fixed-fake collaborators. The
/// returned handle owns every shared collaborator and can be cloned
/// cheaply (its internals are all `Arc`-wrapped) for concurrent callers.
#[must_use]
pub fn build_orchestrator(config: &KernelConfig) -> Orchestrator<InMemoryStore> {
    config.warn_unused();

    let store = Arc::new(InMemoryStore::new());
    let bus = Arc::new(EventBus::new());
    let change_engine = Arc::new(ChangeEngine::new(store.clone(), bus.clone(), Arc::new(IdempotencyCache::new())));
    let registry = Arc::new(register_all());
    let model: Arc<dyn ModelClient> = Arc::new(FixedModelClient { response: String::new() });
    let places: Arc<dyn PlacesProvider> = Arc::new(FixedPlacesProvider {
        search_result: None,
        details: PlaceDetails {
            photos: vec![],
            reviews: vec![],
            rating: None,
            user_ratings_total: None,
            price_level: None,
            opening_hours: vec![],
        },
    });
    let booking = Arc::new(BookingRouter::new());
    let payment: Arc<dyn PaymentGateway> = Arc::new(DecliningPaymentGateway);

    Orchestrator::new(store, change_engine, bus, registry, model, places, booking, payment)
}
