//! Skeleton agent: lays down the day-by-day placeholder structure with no
//! model call, purely from day-of-trip index and a small template table.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use itin_agent::{Agent, AgentCapabilities, AgentContext, AgentError, AgentOutcome};
use itin_bus::AgentKind;
use itin_model::{
    ChangeOperation, ChangeSet, Cost, Details, Links, Location, Node, NodeId, NodeStatus,
    NodeType, Preferences, Scope, Timing, Tips,
};
use itin_store::DocumentStore;

struct NodeTemplate {
    title: &'static str,
    node_type: NodeType,
    start_hhmm: &'static str,
    duration_min: u32,
}

const fn tpl(title: &'static str, node_type: NodeType, start_hhmm: &'static str, duration_min: u32) -> NodeTemplate {
    NodeTemplate { title, node_type, start_hhmm, duration_min }
}

// Titles match `Node::looks_like_placeholder`'s known set verbatim, so a
// populator re-run can tell a seeded node from an already-populated one.
const ARRIVAL_DAY: &[NodeTemplate] = &[
    tpl("Transport", NodeType::Transport, "10:00", 60),
    tpl("Accommodation", NodeType::Accommodation, "12:00", 30),
    tpl("Lunch", NodeType::Meal, "13:00", 60),
    tpl("Afternoon Activity", NodeType::Attraction, "15:00", 120),
    tpl("Dinner", NodeType::Meal, "19:00", 90),
];

const STANDARD_DAY: &[NodeTemplate] = &[
    tpl("Breakfast", NodeType::Meal, "08:00", 30),
    tpl("Morning Activity", NodeType::Attraction, "09:00", 150),
    tpl("Lunch", NodeType::Meal, "12:30", 60),
    tpl("Afternoon Activity", NodeType::Attraction, "14:00", 180),
    tpl("Dinner", NodeType::Meal, "18:30", 90),
    tpl("Evening Activity", NodeType::Attraction, "20:15", 90),
];

const DEPARTURE_DAY: &[NodeTemplate] = &[
    tpl("Breakfast", NodeType::Meal, "08:00", 30),
    tpl("Morning Activity", NodeType::Attraction, "09:00", 120),
    tpl("Lunch", NodeType::Meal, "12:00", 60),
    tpl("Transport", NodeType::Transport, "14:00", 60),
];

/// Deterministic template lookup keyed by day-of-trip index, so the same
/// create request always regenerates the same skeleton shape.
fn template_for(day_index: usize) -> &'static [NodeTemplate] {
    match day_index % 3 {
        0 => ARRIVAL_DAY,
        1 => STANDARD_DAY,
        _ => DEPARTURE_DAY,
    }
}

fn epoch_ms(date: &str, hhmm: &str) -> i64 {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .unwrap_or_else(|_| NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid constant date"));
    let time = NaiveTime::parse_from_str(hhmm, "%H:%M")
        .unwrap_or_else(|_| NaiveTime::from_hms_opt(0, 0, 0).expect("valid constant time"));
    date.and_time(time).and_utc().timestamp_millis()
}

fn build_node(day_number: u32, index: u32, date: &str, template: &NodeTemplate, now_ms: i64) -> Node {
    let start = epoch_ms(date, template.start_hhmm);
    Node {
        id: NodeId::skeleton(day_number, index),
        node_type: template.node_type,
        title: template.title.to_string(),
        location: Location::default(),
        timing: Timing {
            start_time: Some(start),
            end_time: Some(start + i64::from(template.duration_min) * 60_000),
            duration_min: Some(template.duration_min),
        },
        cost: Cost::default(),
        details: Details::default(),
        labels: vec![],
        tips: Tips::default(),
        links: Links::default(),
        locked: false,
        status: NodeStatus::Planned,
        updated_by: "skeleton".to_string(),
        updated_at: now_ms,
        agent_data: std::collections::HashMap::new(),
    }
}

/// Generates the placeholder day structure. Runs once per day: a day that
/// already has nodes is left untouched, which makes a retried `generate`
/// call idempotent.
pub struct SkeletonAgent {
    caps: AgentCapabilities,
}

impl SkeletonAgent {
    #[must_use]
    pub fn new() -> Self {
        Self { caps: AgentCapabilities::new(["skeleton"], 1, false) }
    }
}

impl Default for SkeletonAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S: DocumentStore> Agent<S> for SkeletonAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Skeleton
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
        let mut days_seeded = 0usize;

        for (day_index, day) in doc.days.iter().enumerate() {
            if !day.nodes.is_empty() {
                continue;
            }

            let template = template_for(day_index);
            let mut ops = Vec::with_capacity(template.len());
            let mut after: Option<NodeId> = None;
            for (i, node_template) in template.iter().enumerate() {
                let node = build_node(day.day_number, (i + 1) as u32, &day.date, node_template, now_ms);
                let id = node.id.clone();
                ops.push(ChangeOperation::Insert { after: after.clone(), node });
                after = Some(id);
            }

            let change_set = ChangeSet {
                scope: Scope::Day,
                day: Some(day.day_number),
                base_version: None,
                idempotency_key: None,
                ops,
                preferences: Preferences { user_first: true, respect_locks: false, auto_apply: true },
                reason: Some(format!("skeleton seed for day {}", day.day_number)),
                agent: "skeleton".to_string(),
            };

            ctx.change_engine.apply(&ctx.itinerary_id, change_set).await?;
            days_seeded += 1;
        }

        Ok(AgentOutcome {
            message: Some(format!("seeded {days_seeded} day(s)")),
            ..Default::default()
        })
    }
}
