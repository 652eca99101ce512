//! Booking agent: charges payment, then books through the provider
//! router, refunding automatically if the booking step fails after a
//! successful charge so a failed booking never leaves a stranded charge.

use async_trait::async_trait;
use serde_json::{json, Value};

use itin_agent::{Agent, AgentCapabilities, AgentContext, AgentError, AgentOutcome};
use itin_bus::AgentKind;
use itin_model::{ChangeOperation, ChangeSet, NodeId, Preferences, Scope};
use itin_providers::{BookingRequest, BookingType, PaymentRequest};
use itin_store::DocumentStore;

fn parse_booking_type(value: &str) -> Option<BookingType> {
    match value {
        "hotel" | "accommodation" => Some(BookingType::Hotel),
        "flight" | "transport" => Some(BookingType::Flight),
        "activity" | "attraction" => Some(BookingType::Activity),
        _ => None,
    }
}

pub struct BookingAgent {
    caps: AgentCapabilities,
}

impl BookingAgent {
    #[must_use]
    pub fn new() -> Self {
        Self { caps: AgentCapabilities::new(["book"], 5, true) }
    }
}

impl Default for BookingAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: DocumentStore> Agent<S> for BookingAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Booking
    }

    fn capabilities(&self) -> &AgentCapabilities {
        &self.caps
    }

    async fn execute(&self, ctx: &AgentContext<S>) -> Result<AgentOutcome, AgentError> {
        let node_id = ctx
            .payload
            .get("nodeId")
            .and_then(Value::as_str)
            .map(NodeId::from_string)
            .ok_or_else(|| AgentError::Other("booking request missing nodeId".to_string()))?;

        let booking_type_raw = ctx.payload.get("bookingType").and_then(Value::as_str).unwrap_or("");
        let booking_type = parse_booking_type(booking_type_raw)
            .ok_or_else(|| AgentError::Other(format!("unsupported booking type: {booking_type_raw}")))?;

        let amount = ctx.payload.get("amount").and_then(Value::as_u64).unwrap_or(0) as u32;
        let currency = ctx.payload.get("currency").and_then(Value::as_str).unwrap_or("USD").to_string();

        let receipt = ctx
            .payment
            .charge(PaymentRequest { amount, currency: currency.clone(), reference: node_id.to_string() })
            .await
            .map_err(|e| AgentError::Provider(e.to_string()))?;

        let booking_details = ctx.payload.get("details").cloned().unwrap_or(Value::Null);
        let booking_result = ctx
            .booking
            .book(booking_type, BookingRequest { node_id: node_id.to_string(), details: booking_details })
            .await;

        let booking_receipt = match booking_result {
            Ok(receipt) => receipt,
            Err(booking_err) => {
                let mut warnings = vec![format!("booking failed: {booking_err}")];
                if let Err(refund_err) = ctx.payment.refund(&receipt.transaction_id).await {
                    warnings.push(format!("refund after failed booking also failed: {refund_err}"));
                } else {
                    warnings.push("payment refunded after failed booking".to_string());
                }
                return Err(AgentError::Provider(warnings.join("; ")));
            }
        };

        let change_set = ChangeSet {
            scope: Scope::Trip,
            day: None,
            base_version: None,
            idempotency_key: None,
            ops: vec![ChangeOperation::Update {
                id: node_id.clone(),
                // Must be `agent_data` to match `Node`'s own field name —
                // the change engine deep-merges this onto the node's
                // serialized (snake_case) shape before deserializing it
                // back, so a mismatched key is silently dropped.
                partial: json!({
                    "agent_data": {
                        "booking": {
                            "confirmationId": booking_receipt.confirmation_id,
                            "status": booking_receipt.status,
                            "transactionId": receipt.transaction_id,
                            "details": booking_receipt.details,
                        }
                    }
                }),
            }],
            preferences: Preferences { user_first: true, respect_locks: false, auto_apply: true },
            reason: Some(format!("booking confirmed for {node_id}")),
            agent: "booking".to_string(),
        };
        ctx.change_engine.apply(&ctx.itinerary_id, change_set).await?;

        Ok(AgentOutcome {
            message: Some(format!("booked {node_id}: {}", booking_receipt.status)),
            ..Default::default()
        })
    }
}
