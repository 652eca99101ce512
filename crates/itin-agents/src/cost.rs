//! Cost estimator: fills in missing per-node cost amounts from a static
//! table and the trip's budget tier. Makes no model call.

use std::collections::HashMap;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde_json::json;

use itin_agent::{Agent, AgentCapabilities, AgentContext, AgentError, AgentOutcome};
use itin_bus::AgentKind;
use itin_model::{BudgetTier, ChangeOperation, ChangeSet, Node, Preferences, Scope};
use itin_store::DocumentStore;

use crate::util::node_type_label;

static BASE_COSTS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("attraction_generic", 25),
        ("attraction_museum", 20),
        ("attraction_landmark", 15),
        ("attraction_tour", 60),
        ("meal_generic", 20),
        ("meal_breakfast", 12),
        ("meal_lunch", 18),
        ("meal_dinner", 35),
        ("transport_generic", 15),
        ("transport_taxi", 25),
        ("transport_transit", 5),
        ("accommodation_generic", 120),
        ("accommodation_hotel", 150),
    ])
});

fn cost_key(node: &Node) -> String {
    let category = node
        .details
        .category
        .as_deref()
        .unwrap_or("generic")
        .to_lowercase()
        .replace(' ', "_");
    format!("{}_{category}", node_type_label(node.node_type))
}

fn base_cost(node: &Node) -> u32 {
    let key = cost_key(node);
    if let Some(amount) = BASE_COSTS.get(key.as_str()) {
        return *amount;
    }
    let fallback = format!("{}_generic", node_type_label(node.node_type));
    BASE_COSTS.get(fallback.as_str()).copied().unwrap_or(20)
}

fn tier_multiplier(tier: BudgetTier) -> f64 {
    match tier {
        BudgetTier::Budget => 0.6,
        BudgetTier::Medium => 1.0,
        BudgetTier::Luxury => 2.0,
    }
}

fn round_to_nearest_50(amount: f64) -> u32 {
    ((amount / 50.0).round() * 50.0).max(0.0) as u32
}

fn estimate(node: &Node, tier: BudgetTier) -> u32 {
    round_to_nearest_50(f64::from(base_cost(node)) * tier_multiplier(tier))
}

/// Fills `cost.amount` for every node that doesn't already carry one, then
/// lets the change engine's own post-apply pass recompute each day's
/// `totalCost`.
pub struct CostEstimatorAgent {
    caps: AgentCapabilities,
}

impl CostEstimatorAgent {
    #[must_use]
    pub fn new() -> Self {
        Self { caps: AgentCapabilities::new(["estimate_costs"], 50, false) }
    }
}

impl Default for CostEstimatorAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: DocumentStore> Agent<S> for CostEstimatorAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Cost
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

        let mut priced = 0usize;
        for day in &doc.days {
            let mut ops = Vec::new();
            for node in &day.nodes {
                if node.cost.amount.is_some() {
                    continue;
                }
                let amount = estimate(node, doc.budget_tier);
                ops.push(ChangeOperation::Update {
                    id: node.id.clone(),
                    partial: json!({ "cost": { "amount": amount, "currency": doc.currency, "per": "person" } }),
                });
            }
            if ops.is_empty() {
                continue;
            }
            let change_set = ChangeSet {
                scope: Scope::Day,
                day: Some(day.day_number),
                base_version: None,
                idempotency_key: None,
                ops,
                preferences: Preferences { user_first: false, respect_locks: true, auto_apply: true },
                reason: Some(format!("cost estimate for day {}", day.day_number)),
                agent: "cost".to_string(),
            };
            priced += change_set.ops.len();
            ctx.change_engine.apply(&ctx.itinerary_id, change_set).await?;
        }

        Ok(AgentOutcome {
            message: Some(format!("estimated cost for {priced} node(s)")),
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itin_model::{Cost, Details, Links, Location, NodeId, NodeStatus, NodeType, Timing, Tips};
    use std::collections::HashMap as StdHashMap;

    fn node(node_type: NodeType, category: Option<&str>) -> Node {
        Node {
            id: NodeId::from_string("n"),
            node_type,
            title: "x".to_string(),
            location: Location::default(),
            timing: Timing::default(),
            cost: Cost::default(),
            details: Details { category: category.map(str::to_string), ..Details::default() },
            labels: vec![],
            tips: Tips::default(),
            links: Links::default(),
            locked: false,
            status: NodeStatus::Planned,
            updated_by: "t".to_string(),
            updated_at: 0,
            agent_data: StdHashMap::new(),
        }
    }

    #[test]
    fn unknown_category_falls_back_to_generic() {
        let n = node(NodeType::Attraction, Some("volcano"));
        assert_eq!(base_cost(&n), base_cost(&node(NodeType::Attraction, None)));
    }

    #[test]
    fn known_category_hits_table_directly() {
        let n = node(NodeType::Meal, Some("dinner"));
        assert_eq!(base_cost(&n), 35);
    }

    #[test]
    fn tier_multiplier_scales_estimate() {
        let n = node(NodeType::Meal, Some("dinner"));
        let budget = estimate(&n, BudgetTier::Budget);
        let luxury = estimate(&n, BudgetTier::Luxury);
        assert!(luxury > budget);
    }

    #[test]
    fn estimate_rounds_to_nearest_fifty() {
        let n = node(NodeType::Attraction, Some("tour"));
        let amount = estimate(&n, BudgetTier::Medium);
        assert_eq!(amount % 50, 0);
    }
}
