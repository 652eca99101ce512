//! Payment and third-party booking gateways: request/response shapes
//! only, payment settlement is explicitly not this core's concern.

use async_trait::async_trait;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingType {
    Hotel,
    Flight,
    Activity,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment failed: {0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("unsupported booking type")]
    UnsupportedType,
    #[error("booking failed: {0}")]
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: u32,
    pub currency: String,
    pub reference: String,
}

#[derive(Debug, Clone)]
pub struct PaymentReceipt {
    pub transaction_id: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, request: PaymentRequest) -> Result<PaymentReceipt, PaymentError>;
    async fn refund(&self, transaction_id: &str) -> Result<(), PaymentError>;
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub node_id: String,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct BookingReceipt {
    pub confirmation_id: String,
    pub status: String,
    pub details: serde_json::Value,
}

#[async_trait]
pub trait BookingProvider: Send + Sync {
    fn booking_type(&self) -> BookingType;
    async fn book(&self, request: BookingRequest) -> Result<BookingReceipt, BookingError>;
}

/// Dispatches to one of the three registered provider collaborators by
/// `BookingType`.
#[derive(Default)]
pub struct BookingRouter {
    providers: Vec<Box<dyn BookingProvider>>,
}

impl BookingRouter {
    #[must_use]
    pub fn new() -> Self {
        Self { providers: Vec::new() }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: Box<dyn BookingProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub async fn book(
        &self,
        booking_type: BookingType,
        request: BookingRequest,
    ) -> Result<BookingReceipt, BookingError> {
        let provider = self
            .providers
            .iter()
            .find(|p| p.booking_type() == booking_type)
            .ok_or(BookingError::UnsupportedType)?;
        provider.book(request).await
    }
}
