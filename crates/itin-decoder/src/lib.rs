//! Structured-output decoder: centralizes model-response repair and
//! domain coercion so agents pass only a schema, never hand-roll string
//! surgery at the call site.
//!
//! # Example
//!
//! ```rust,ignore
//! use itin_decoder::decode;
//!
//! let outcome = decode(&model, prompt, &schema, &raw_response, Some("2025-10-04")).await;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod coerce;
mod decoder;
mod strip;

pub use coerce::{apply_coercions, coerce_booking_url, coerce_numeric_duration, hhmm_to_epoch_ms};
pub use decoder::{decode, DecodeOutcome};
pub use strip::{scrub_non_ascii_intrusions, strip_fences_and_preamble};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
