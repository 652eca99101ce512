//! The specialized agent implementations: skeleton, the per-category
//! populators, cost estimator, enrichment, planner/editor, explainer, and
//! booking. Each implements [`itin_agent::Agent`] against the shared
//! [`itin_agent::AgentContext`]; [`register_all`] wires every one of them
//! into a fresh registry for the orchestrator and chat router to dispatch
//! through.
//!
//! # Example
//!
//! ```rust,ignore
//! use itin_agents::register_all;
//!
//! let registry = register_all();
//! let agent = registry.dispatch("skeleton").expect("skeleton always registered");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod booking;
mod cost;
mod edit;
mod enrichment;
mod explainer;
mod populator;
mod skeleton;
mod util;

pub use booking::BookingAgent;
pub use cost::CostEstimatorAgent;
pub use edit::{classify_intent, EditorAgent, PlannerAgent};
pub use enrichment::EnrichmentAgent;
pub use explainer::ExplainerAgent;
pub use populator::{ActivityAgent, MealAgent, TransportAgent};
pub use skeleton::SkeletonAgent;

use std::sync::Arc;

use itin_agent::AgentRegistry;
use itin_store::DocumentStore;

/// Build a registry carrying one instance of every specialized agent.
#[must_use]
pub fn register_all<S: DocumentStore + 'static>() -> AgentRegistry<S> {
    let mut registry = AgentRegistry::new();
    registry.register(Arc::new(SkeletonAgent::new()));
    registry.register(Arc::new(ActivityAgent::new()));
    registry.register(Arc::new(MealAgent::new()));
    registry.register(Arc::new(TransportAgent::new()));
    registry.register(Arc::new(CostEstimatorAgent::new()));
    registry.register(Arc::new(EnrichmentAgent::new()));
    registry.register(Arc::new(PlannerAgent::new()));
    registry.register(Arc::new(EditorAgent::new()));
    registry.register(Arc::new(ExplainerAgent::new()));
    registry.register(Arc::new(BookingAgent::new()));
    registry
}

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use itin_store::InMemoryStore;

    #[test]
    fn register_all_wires_every_task() {
        let registry: AgentRegistry<InMemoryStore> = register_all();
        for task in [
            "skeleton",
            "populate_attractions",
            "populate_meals",
            "populate_transport",
            "estimate_costs",
            "enrich",
            "plan",
            "edit",
            "explain",
            "book",
        ] {
            assert!(registry.dispatch(task).is_some(), "no agent registered for {task}");
        }
    }

    #[test]
    fn only_chat_facing_agents_answer_dispatch_chat() {
        let registry: AgentRegistry<InMemoryStore> = register_all();
        assert!(registry.dispatch_chat("skeleton").is_none());
        assert!(registry.dispatch_chat("edit").is_some());
        assert!(registry.dispatch_chat("explain").is_some());
        assert!(registry.dispatch_chat("book").is_some());
    }
}
