//! Chat router: turns a free-form chat message into a structured change
//! set. Intent classification is delegated to a single model call; the
//! result routes to the change engine directly (`undo`), to a read-only
//! agent (`explain`), to a committing agent (`book`), or to the
//! planner/editor, whose proposed change set is previewed and optionally
//! applied depending on `ChatRequest::auto_apply`.
//!
//! # Example
//!
//! ```rust,ignore
//! use itin_chat::ChatRouter;
//!
//! let response = router.route(chat_request).await;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod candidates;
mod router;

pub use router::ChatRouter;

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
