//! Explainer agent: answers questions about the current itinerary in
//! plain language. Read-only — it never reaches the change engine, so a
//! malformed or refused model response degrades to an apology message
//! rather than a hard failure.

use async_trait::async_trait;
use serde_json::Value;

use itin_agent::{Agent, AgentCapabilities, AgentContext, AgentError, AgentOutcome};
use itin_bus::AgentKind;
use itin_providers::CompletionRequest;
use itin_store::DocumentStore;

use crate::util::node_type_label;

fn context_for(doc: &itin_model::Itinerary, day_number: Option<u32>) -> String {
    let mut text = format!("Trip to {} ({} to {}).\n", doc.destination, doc.start_date, doc.end_date);
    let days = match day_number {
        Some(n) => doc.days.iter().filter(|d| d.day_number == n).collect::<Vec<_>>(),
        None => doc.days.iter().collect(),
    };
    for day in days {
        text.push_str(&format!("Day {} ({}):\n", day.day_number, day.date));
        for node in &day.nodes {
            text.push_str(&format!(
                "  - {} at {}, a {}\n",
                node.title,
                node.location.address.as_deref().unwrap_or("an unspecified location"),
                node_type_label(node.node_type),
            ));
        }
    }
    text
}

pub struct ExplainerAgent {
    caps: AgentCapabilities,
}

impl ExplainerAgent {
    #[must_use]
    pub fn new() -> Self {
        Self { caps: AgentCapabilities::new(["explain"], 5, true) }
    }
}

impl Default for ExplainerAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: DocumentStore> Agent<S> for ExplainerAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Explainer
    }

    fn capabilities(&self) -> &AgentCapabilities {
        &self.caps
    }

    async fn execute(&self, ctx: &AgentContext<S>) -> Result<AgentOutcome, AgentError> {
        let doc = ctx
            .store
            .get(&ctx.itinerary_id)
            .await
            .map_err(|e| AgentError::Other(e.to_string()))?
            .ok_or_else(|| AgentError::Other("itinerary not found".to_string()))?;

        let question = ctx.payload.get("message").and_then(Value::as_str).unwrap_or("What's planned?");
        let day_number = ctx.payload.get("day").and_then(Value::as_u64).map(|d| d as u32);

        let prompt = format!(
            "{}\nAnswer this question about the itinerary above in two or three sentences: {question}",
            context_for(&doc, day_number)
        );

        let answer = match ctx.model.complete(CompletionRequest { prompt, schema: None }).await {
            Ok(response) => response.text,
            Err(_) => "I couldn't put together an answer right now — please try again.".to_string(),
        };

        Ok(AgentOutcome { message: Some(answer), ..Default::default() })
    }
}
