//! Agent trait, shared lifecycle wrapper, and task-type dispatch registry.
//! Specialized agents (skeleton, populators, cost, enrichment, planner,
//! editor, explainer, booking) live in a downstream crate and implement
//! [`Agent`] against the types defined here.
//!
//! # Example
//!
//! ```rust,ignore
//! use itin_agent::{run, AgentContext, AgentRegistry};
//!
//! let agent = registry.dispatch("skeleton").expect("no agent for task");
//! let outcome = run(agent.as_ref(), ctx).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod agent;
mod error;
mod registry;

pub use agent::{run, task_type_for, Agent, AgentCapabilities, AgentContext, AgentOutcome};
pub use error::AgentError;
pub use registry::AgentRegistry;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
