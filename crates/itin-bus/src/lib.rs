//! Per-itinerary event bus.
//!
//! # Example
//!
//! ```rust,ignore
//! use itin_bus::EventBus;
//!
//! let bus = EventBus::new();
//! let mut sub = bus.subscribe(&itinerary_id);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod bus;
mod event;

pub use bus::{EventBus, Subscription};
pub use event::{AgentEvent, AgentEventStatus, AgentKind, BusEvent, PatchEvent};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
