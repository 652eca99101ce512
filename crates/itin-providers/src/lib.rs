//! External collaborator interfaces named as out-of-scope in the
//! orchestration core: the model client, places provider, payment
//! gateway, and booking providers. Modeled as traits plus fixed-answer
//! fakes for tests and the demo CLI — no real network client is
//! implemented here.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod booking;
mod model;
mod places;

pub use booking::{
    BookingError, BookingProvider, BookingReceipt, BookingRequest, BookingRouter, BookingType,
    PaymentError, PaymentGateway, PaymentReceipt, PaymentRequest,
};
pub use model::{CompletionRequest, CompletionResponse, FixedModelClient, ModelClient, ModelError};
pub use places::{FixedPlacesProvider, PlaceDetails, PlacesError, PlacesProvider, PlaceSearchResult};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
