//! Change engine: the sole authority that mutates an itinerary document.
//! Every agent and every conversational edit goes through `propose`/
//! `apply`/`undo`/`rollback` here — nothing else is allowed to write a
//! new version of a document.
//!
//! # Example
//!
//! ```rust,ignore
//! use itin_change::ChangeEngine;
//!
//! let engine = ChangeEngine::new(store, bus, idempotency);
//! let result = engine.apply(&itinerary_id, change_set).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod apply;
mod diff;
mod engine;
mod error;

pub use diff::compute_diff;
pub use engine::{ApplyResult, ChangeEngine};
pub use error::ChangeEngineError;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
