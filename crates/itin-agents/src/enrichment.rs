//! Enrichment agent: fills in coordinates, photos, reviews, and
//! pacing/opening-hour tips for already-populated nodes, and estimates
//! transit time between consecutive nodes within a day.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::json;

use itin_agent::{Agent, AgentCapabilities, AgentContext, AgentError, AgentOutcome};
use itin_bus::AgentKind;
use itin_model::{ChangeOperation, ChangeSet, Coordinates, Node, NodeType, Preferences, Scope, TransitInfo};
use itin_providers::PlaceDetails;
use itin_store::DocumentStore;

use crate::util::node_type_label;

const STALENESS_WINDOW_MS: i64 = 7 * 24 * 60 * 60 * 1000;
const EARTH_RADIUS_KM: f64 = 6371.0;
const WALK_MIN_PER_KM: f64 = 12.0;

fn is_specific_query(title: &str) -> bool {
    let word_count = title.split_whitespace().count();
    let has_distinguishing_punctuation = title.chars().any(|c| matches!(c, '\'' | '-' | '&'));
    word_count >= 3 || has_distinguishing_punctuation
}

fn synthesize_query(node: &Node, destination: &str) -> String {
    if is_specific_query(&node.title) {
        format!("{}, {destination}", node.title)
    } else {
        format!("{} {} in {destination}", node_type_label(node.node_type), node.title)
    }
}

/// Enrichment only ever touches attraction/meal nodes: accommodation and
/// transport legs are booked through their own providers and never go
/// through the places search/details flow.
fn is_enrichable_type(node_type: NodeType) -> bool {
    matches!(node_type, NodeType::Attraction | NodeType::Meal)
}

fn needs_enrichment(node: &Node, now_ms: i64) -> bool {
    let coords_missing = !node
        .location
        .coordinates
        .map(|c| c.is_valid())
        .unwrap_or(false);
    if coords_missing {
        return true;
    }
    match node.agent_data.get("enrichment").and_then(|v| v.get("enrichedAt")).and_then(|v| v.as_i64()) {
        Some(enriched_at) => now_ms - enriched_at > STALENESS_WINDOW_MS,
        None => true,
    }
}

fn dedup_reviews(details: &PlaceDetails) -> Vec<serde_json::Value> {
    let mut by_author: IndexMap<String, serde_json::Value> = IndexMap::new();
    for (author, rating, text) in &details.reviews {
        by_author
            .entry(author.clone())
            .or_insert_with(|| json!({ "author": author, "rating": rating, "text": text }));
    }
    by_author.into_values().collect()
}

fn synthesize_tips(node_type_is_generic: bool, rating: Option<f32>, duration_min: Option<u32>, opening_hours: &[String]) -> (Vec<String>, Vec<String>, Vec<String>) {
    let mut warnings = Vec::new();
    let mut travel = Vec::new();
    let mut general = Vec::new();

    if let Some(rating) = rating {
        if rating < 3.5 {
            warnings.push("Mixed reviews — check recent feedback before visiting.".to_string());
        }
    }
    if let Some(duration_min) = duration_min {
        if duration_min < 30 && node_type_is_generic {
            travel.push("This stop is brief — consider combining it with something nearby.".to_string());
        }
    }
    if let Some(hours) = opening_hours.first() {
        general.push(format!("Hours: {hours}"));
    }
    (warnings, travel, general)
}

fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

fn estimate_transit_min(a: Coordinates, b: Coordinates) -> u32 {
    let km = haversine_km(a, b);
    (km * WALK_MIN_PER_KM).round().max(5.0) as u32
}

/// Fills in location detail, reviews, and tips for every node that either
/// has no valid coordinates yet or hasn't been (re-)enriched within the
/// staleness window, then estimates transit time between consecutive
/// nodes within each day.
pub struct EnrichmentAgent {
    caps: AgentCapabilities,
}

impl EnrichmentAgent {
    #[must_use]
    pub fn new() -> Self {
        Self { caps: AgentCapabilities::new(["enrich"], 20, false) }
    }
}

impl Default for EnrichmentAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: DocumentStore> Agent<S> for EnrichmentAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Enrichment
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

        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut warnings = Vec::new();
        let mut enriched_count = 0usize;

        for day in &doc.days {
            let mut ops = Vec::new();

            for node in &day.nodes {
                if node.locked || !is_enrichable_type(node.node_type) {
                    continue;
                }
                if node.looks_like_placeholder() || !needs_enrichment(node, now_ms) {
                    continue;
                }

                let query = synthesize_query(node, &doc.destination);
                let search_result = match ctx.places.search(&query).await {
                    Ok(Some(result)) => result,
                    Ok(None) => {
                        warnings.push(format!("no place match for {}", node.id));
                        continue;
                    }
                    Err(err) => {
                        warnings.push(format!("places search failed for {}: {err}", node.id));
                        continue;
                    }
                };

                let details = match ctx.places.details(&search_result.place_id).await {
                    Ok(details) => details,
                    Err(err) => {
                        warnings.push(format!("places details failed for {}: {err}", node.id));
                        continue;
                    }
                };

                let reviews = dedup_reviews(&details);
                let (tip_warnings, tip_travel, tip_general) = synthesize_tips(
                    !is_specific_query(&node.title),
                    details.rating.or(search_result.rating),
                    node.timing.duration_min,
                    &details.opening_hours,
                );

                // Keys here must match `Node`'s own (snake_case) field
                // names: this patch is deep-merged straight onto
                // `serde_json::to_value(&node)` in the change engine, so
                // any key that doesn't match a real field is silently
                // dropped when the merged value is deserialized back.
                let patch = json!({
                    "location": {
                        "place_id": search_result.place_id,
                        "address": search_result.formatted_address,
                        "coordinates": { "lat": search_result.coordinates.lat, "lng": search_result.coordinates.lng },
                        "rating": details.rating,
                        "user_ratings_total": details.user_ratings_total,
                        "price_level": details.price_level,
                        "photos": details.photos.iter().map(|p| json!({ "reference": p })).collect::<Vec<_>>(),
                    },
                    "details": { "rating": details.rating, "reviews": reviews },
                    "tips": { "warnings": tip_warnings, "travel": tip_travel, "general": tip_general },
                    "agent_data": { "enrichment": { "enrichedAt": now_ms } },
                });
                ops.push(ChangeOperation::Update { id: node.id.clone(), partial: patch });
                enriched_count += 1;
            }

            for window in day.nodes.windows(2) {
                let (from, to) = (&window[0], &window[1]);
                let (Some(a), Some(b)) = (
                    from.location.coordinates.filter(Coordinates::is_valid),
                    to.location.coordinates.filter(Coordinates::is_valid),
                ) else {
                    continue;
                };
                let duration_min = estimate_transit_min(a, b);
                ops.push(ChangeOperation::UpdateEdge {
                    id: None,
                    from: Some(from.id.clone()),
                    to: Some(to.id.clone()),
                    transit: Some(TransitInfo { mode: Some("walk".to_string()), duration_min: Some(duration_min) }),
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
                reason: Some(format!("enrichment for day {}", day.day_number)),
                agent: "enrichment".to_string(),
            };
            ctx.change_engine.apply(&ctx.itinerary_id, change_set).await?;
        }

        Ok(AgentOutcome {
            message: Some(format!("enriched {enriched_count} node(s)")),
            warnings,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Arc;

    use itin_agent::AgentContext;
    use itin_bus::EventBus;
    use itin_change::ChangeEngine;
    use itin_idempotency::IdempotencyCache;
    use itin_model::{
        BudgetTier, Cost, Day, Details, Itinerary, ItineraryId, Links, Location, NodeId,
        NodeStatus, Settings, Timing, Tips,
    };
    use itin_providers::{
        BookingRouter, FixedModelClient, FixedPlacesProvider, ModelClient, PaymentError,
        PaymentGateway, PaymentReceipt, PaymentRequest, PlaceDetails, PlaceSearchResult,
        PlacesProvider,
    };
    use itin_store::{DocumentStore, InMemoryStore};

    struct NoPayments;

    #[async_trait::async_trait]
    impl PaymentGateway for NoPayments {
        async fn charge(&self, _request: PaymentRequest) -> Result<PaymentReceipt, PaymentError> {
            Err(PaymentError::Failed("no payment gateway wired in tests".to_string()))
        }
        async fn refund(&self, _transaction_id: &str) -> Result<(), PaymentError> {
            Ok(())
        }
    }

    fn attraction_node(id: &str) -> Node {
        Node {
            id: NodeId::from_string(id),
            node_type: NodeType::Attraction,
            title: "Senso-ji Temple".to_string(),
            location: Location::default(),
            timing: Timing::default(),
            cost: Cost::default(),
            details: Details::default(),
            labels: vec![],
            tips: Tips::default(),
            links: Links::default(),
            locked: false,
            status: NodeStatus::Planned,
            updated_by: "populator".to_string(),
            updated_at: 0,
            agent_data: HashMap::new(),
        }
    }

    fn doc_with(id: ItineraryId, node: Node) -> Itinerary {
        Itinerary {
            id,
            version: 1,
            user_id: "u1".to_string(),
            destination: "Tokyo".to_string(),
            start_date: "2025-10-04".to_string(),
            end_date: "2025-10-04".to_string(),
            themes: vec![],
            currency: "USD".to_string(),
            budget_tier: BudgetTier::Medium,
            days: vec![Day {
                day_number: 1,
                date: "2025-10-04".to_string(),
                location: None,
                summary: None,
                total_cost: None,
                nodes: vec![node],
                edges: vec![],
            }],
            settings: Settings::default(),
            agents: HashMap::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn context_with_match(store: Arc<InMemoryStore>, itinerary_id: ItineraryId) -> AgentContext<InMemoryStore> {
        let bus = Arc::new(EventBus::new());
        let change_engine =
            Arc::new(ChangeEngine::new(store.clone(), bus.clone(), Arc::new(IdempotencyCache::new())));
        let model: Arc<dyn ModelClient> = Arc::new(FixedModelClient { response: String::new() });
        let places: Arc<dyn PlacesProvider> = Arc::new(FixedPlacesProvider {
            search_result: Some(PlaceSearchResult {
                place_id: "ChIJ_senso_ji".to_string(),
                formatted_address: "2 Chome-3-1 Asakusa, Taito City, Tokyo".to_string(),
                coordinates: Coordinates { lat: 35.7148, lng: 139.7967 },
                rating: Some(4.5),
            }),
            details: PlaceDetails {
                photos: vec!["photo_ref_1".to_string()],
                reviews: vec![("A. Visitor".to_string(), Some(4.0), Some("Lovely".to_string()))],
                rating: Some(4.5),
                user_ratings_total: Some(1200),
                price_level: Some(0),
                opening_hours: vec!["06:00-17:00".to_string()],
            },
        });
        let booking = Arc::new(BookingRouter::new());
        let payment: Arc<dyn PaymentGateway> = Arc::new(NoPayments);
        AgentContext {
            itinerary_id,
            task_type: "enrich".to_string(),
            payload: serde_json::Value::Null,
            store,
            change_engine,
            bus,
            model,
            places,
            booking,
            payment,
        }
    }

    #[tokio::test]
    async fn enrichment_sets_place_id_and_repeating_it_is_a_noop() {
        let store = Arc::new(InMemoryStore::new());
        let itinerary_id = ItineraryId::from_string("trip-enrich");
        store.set(&itinerary_id, doc_with(itinerary_id.clone(), attraction_node("day1_node1"))).await.unwrap();
        let ctx = context_with_match(store.clone(), itinerary_id.clone());

        let agent = EnrichmentAgent::new();
        agent.execute(&ctx).await.unwrap();

        let doc = store.get(&itinerary_id).await.unwrap().unwrap();
        let node = &doc.days[0].nodes[0];
        assert_eq!(node.location.place_id.as_deref(), Some("ChIJ_senso_ji"));
        assert_eq!(node.location.user_ratings_total, Some(1200));
        assert!(
            node.agent_data.get("enrichment").and_then(|v| v.get("enrichedAt")).is_some(),
            "enrichedAt marker should be persisted under agent_data"
        );
        let version_after_first_run = doc.version;

        // Running enrichment again within the staleness window should see
        // coordinates already valid and `enrichedAt` fresh, so it finds
        // nothing left to do and the document version does not move.
        agent.execute(&ctx).await.unwrap();
        let doc = store.get(&itinerary_id).await.unwrap().unwrap();
        assert_eq!(doc.version, version_after_first_run);
    }

    #[test]
    fn short_generic_title_is_not_specific() {
        assert!(!is_specific_query("Lunch"));
        assert!(!is_specific_query("Morning Activity"));
    }

    #[test]
    fn long_or_punctuated_title_is_specific() {
        assert!(is_specific_query("Senso-ji Temple"));
        assert!(is_specific_query("Tsukiji Outer Market Food Tour"));
    }

    #[test]
    fn haversine_zero_for_identical_points() {
        let p = Coordinates { lat: 35.71, lng: 139.79 };
        assert!(haversine_km(p, p) < 1e-9);
    }

    #[test]
    fn transit_estimate_has_a_floor() {
        let a = Coordinates { lat: 35.7100, lng: 139.7900 };
        let b = Coordinates { lat: 35.7101, lng: 139.7901 };
        assert_eq!(estimate_transit_min(a, b), 5);
    }

    #[test]
    fn low_rating_produces_a_warning_tip() {
        let (warnings, _, _) = synthesize_tips(false, Some(2.9), None, &[]);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn only_attractions_and_meals_are_enrichable() {
        assert!(is_enrichable_type(NodeType::Attraction));
        assert!(is_enrichable_type(NodeType::Meal));
        assert!(!is_enrichable_type(NodeType::Accommodation));
        assert!(!is_enrichable_type(NodeType::Transport));
    }
}
