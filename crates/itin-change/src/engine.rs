//! The change engine itself: the only code path allowed to persist a
//! mutated document.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use itin_bus::{BusEvent, EventBus, PatchEvent};
use itin_idempotency::{CachedResponse, IdempotencyCache, IdempotencyKey};
use itin_model::{ChangeSet, Diff, Itinerary, ItineraryId, Revision, RevisionId};
use itin_store::DocumentStore;

use crate::apply::execute_ops;
use crate::diff::compute_diff;
use crate::error::ChangeEngineError;

const MAX_WRITE_RETRIES: u32 = 3;

/// Outcome of a successful `propose`, `apply`, `undo`, or `rollback` call.
/// `revision_id` is `None` for `propose`, since a dry run never appends a
/// revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyResult {
    pub itinerary: Itinerary,
    pub diff: Diff,
    pub revision_id: Option<RevisionId>,
}

/// Validate and execute one change set against `doc` without persisting
/// anything. Shared by `propose` and the write path of `apply`.
fn run_change_set(
    doc: &Itinerary,
    change_set: &ChangeSet,
    now_ms: i64,
) -> Result<(Itinerary, Diff), ChangeEngineError> {
    if let Some(base) = change_set.base_version {
        if base != doc.version {
            return Err(ChangeEngineError::VersionConflict);
        }
    }

    if change_set.ops.is_empty() {
        // An empty op list is only an error when the caller gave no reason
        // for it either; an explained empty change set (e.g. an editor
        // bailing out on a lock conflict) is a legitimate no-op apply that
        // leaves the document untouched.
        if change_set.reason.is_none() {
            return Err(ChangeEngineError::NoOps);
        }
        return Ok((doc.clone(), Diff { to_version: doc.version, ..Diff::default() }));
    }

    if change_set.preferences.respect_locks && !change_set.preferences.user_first {
        for op in &change_set.ops {
            if let Some(id) = op.target_node_id() {
                if let Some(node) = doc.days.iter().find_map(|d| d.find_node(id)) {
                    if node.locked {
                        return Err(ChangeEngineError::NodeLocked(id.clone()));
                    }
                }
            }
        }
    }

    let mut working = doc.clone();
    execute_ops(&mut working, change_set, now_ms, &change_set.agent)?;
    working.version = doc.version + 1;
    working.check_invariants()?;

    let diff = compute_diff(doc, &working, working.version);
    Ok((working, diff))
}

/// The sole authority that mutates an itinerary document. Holds a per-id
/// mutex so two change sets against the same itinerary never interleave,
/// regardless of how many callers (agents, chat, the HTTP-equivalent
/// surface) hold a reference to the engine.
pub struct ChangeEngine<S: DocumentStore> {
    store: Arc<S>,
    bus: Arc<EventBus>,
    idempotency: Arc<IdempotencyCache>,
    locks: DashMap<ItineraryId, Arc<Mutex<()>>>,
}

impl<S: DocumentStore + 'static> ChangeEngine<S> {
    #[must_use]
    pub fn new(store: Arc<S>, bus: Arc<EventBus>, idempotency: Arc<IdempotencyCache>) -> Self {
        Self { store, bus, idempotency, locks: DashMap::new() }
    }

    fn lock_for(&self, id: &ItineraryId) -> Arc<Mutex<()>> {
        self.locks.entry(id.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Non-mutating dry run: computes what `apply` would produce without
    /// writing it anywhere.
    pub async fn propose(
        &self,
        id: &ItineraryId,
        change_set: &ChangeSet,
    ) -> Result<ApplyResult, ChangeEngineError> {
        let doc = self.store.get(id).await?.ok_or(ChangeEngineError::ItineraryNotFound)?;
        let now_ms = chrono::Utc::now().timestamp_millis();
        let (new_doc, diff) = run_change_set(&doc, change_set, now_ms)?;
        Ok(ApplyResult { itinerary: new_doc, diff, revision_id: None })
    }

    /// Apply and persist a change set. Deduplicated by
    /// `change_set.idempotency_key` when present, reusing the same cache
    /// that guards booking and payment calls.
    pub async fn apply(
        &self,
        id: &ItineraryId,
        change_set: ChangeSet,
    ) -> Result<ApplyResult, ChangeEngineError> {
        let Some(client_key) = change_set.idempotency_key.clone() else {
            return self.apply_uncached(id, &change_set).await;
        };

        let idem_key = IdempotencyKey::compute(&client_key, "apply", id.as_str(), &change_set.agent);
        let error_slot: std::sync::Mutex<Option<ChangeEngineError>> = std::sync::Mutex::new(None);

        let outcome = self
            .idempotency
            .execute(idem_key, || async {
                match self.apply_uncached(id, &change_set).await {
                    Ok(result) => CachedResponse {
                        status: 200,
                        headers: vec![],
                        body: serde_json::to_value(&result).unwrap_or_default(),
                    },
                    Err(err) => {
                        let status = match err {
                            ChangeEngineError::VersionConflict => 409,
                            ChangeEngineError::NodeLocked(_) => 423,
                            ChangeEngineError::NoOps
                            | ChangeEngineError::SchemaInvalid(_)
                            | ChangeEngineError::AfterNotFound(_)
                            | ChangeEngineError::NodeNotFound(_)
                            | ChangeEngineError::InvalidStateTransition(_) => 422,
                            _ => 500,
                        };
                        *error_slot.lock().unwrap() = Some(err);
                        CachedResponse { status, headers: vec![], body: serde_json::Value::Null }
                    }
                }
            })
            .await
            .map_err(|_| ChangeEngineError::IdempotencyRace)?;

        match outcome {
            itin_idempotency::IdempotencyOutcome::Replayed(cached)
            | itin_idempotency::IdempotencyOutcome::Fresh(cached) => {
                if (200..300).contains(&cached.status) {
                    serde_json::from_value(cached.body)
                        .map_err(|e| ChangeEngineError::SchemaInvalid(e.to_string()))
                } else if let Some(err) = error_slot.lock().unwrap().take() {
                    Err(err)
                } else {
                    // Replayed a non-2xx response: the original error was
                    // never cached, so this can only happen if the same
                    // key raced across two in-flight executions.
                    Err(ChangeEngineError::IdempotencyRace)
                }
            }
        }
    }

    async fn apply_uncached(
        &self,
        id: &ItineraryId,
        change_set: &ChangeSet,
    ) -> Result<ApplyResult, ChangeEngineError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let mut attempt = 0u32;
        loop {
            let doc = self.store.get(id).await?.ok_or(ChangeEngineError::ItineraryNotFound)?;
            let now_ms = chrono::Utc::now().timestamp_millis();
            let (new_doc, diff) = run_change_set(&doc, change_set, now_ms)?;

            if new_doc.version == doc.version {
                // Explained empty op list: nothing to persist, no revision,
                // no version bump.
                return Ok(ApplyResult { itinerary: new_doc, diff, revision_id: None });
            }

            let revision = Revision {
                revision_id: RevisionId::new(),
                itinerary_id: id.clone(),
                version_number: new_doc.version,
                created_by: change_set.agent.clone(),
                created_at: now_ms,
                description: change_set.reason.clone(),
                change_count: change_set.ops.len(),
                snapshot: doc,
                diff: diff.clone(),
            };

            match self.store.set(id, new_doc.clone()).await {
                Ok(()) => {
                    self.store.add_revision(id, revision.clone()).await?;
                    self.publish_patch(id, new_doc.version);
                    return Ok(ApplyResult {
                        itinerary: new_doc,
                        diff,
                        revision_id: Some(revision.revision_id),
                    });
                }
                Err(store_err) => {
                    attempt += 1;
                    if attempt >= MAX_WRITE_RETRIES {
                        return Err(ChangeEngineError::Store(store_err));
                    }
                    let jitter_ms = rand::rng().random_range(0..20);
                    tokio::time::sleep(Duration::from_millis(10 * 2u64.pow(attempt) + jitter_ms)).await;
                }
            }
        }
    }

    /// `undo(id)` is `rollback(id, current.version - 1)`.
    pub async fn undo(&self, id: &ItineraryId, actor: &str) -> Result<ApplyResult, ChangeEngineError> {
        let doc = self.store.get(id).await?.ok_or(ChangeEngineError::ItineraryNotFound)?;
        if doc.version <= 1 {
            return Err(ChangeEngineError::NoOps);
        }
        self.rollback(id, doc.version - 1, actor).await
    }

    /// Restore the document to the state it held at `target_version`. The
    /// revision recorded when the apply that produced `target_version + 1`
    /// ran stores that apply's pre-image as `snapshot` — which is exactly
    /// the state at `target_version` — so rollback is a lookup, not a
    /// replay of history.
    pub async fn rollback(
        &self,
        id: &ItineraryId,
        target_version: u64,
        actor: &str,
    ) -> Result<ApplyResult, ChangeEngineError> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;

        let current = self.store.get(id).await?.ok_or(ChangeEngineError::ItineraryNotFound)?;
        let revision = self.store.get_revision_by_version(id, target_version + 1).await?;

        let now_ms = chrono::Utc::now().timestamp_millis();
        let mut restored = revision.snapshot.clone();
        restored.version = current.version + 1;
        restored.updated_at = now_ms;
        restored.check_invariants()?;

        let diff = compute_diff(&current, &restored, restored.version);
        let rollback_revision = Revision {
            revision_id: RevisionId::new(),
            itinerary_id: id.clone(),
            version_number: restored.version,
            created_by: actor.to_string(),
            created_at: now_ms,
            description: Some(format!("rollback to version {target_version}")),
            change_count: 0,
            snapshot: current,
            diff: diff.clone(),
        };

        self.store.set(id, restored.clone()).await?;
        self.store.add_revision(id, rollback_revision.clone()).await?;
        self.publish_patch(id, restored.version);

        Ok(ApplyResult { itinerary: restored, diff, revision_id: Some(rollback_revision.revision_id) })
    }

    fn publish_patch(&self, id: &ItineraryId, to_version: u64) {
        self.bus.publish(BusEvent::Patch(PatchEvent::PatchApplied {
            itinerary_id: id.clone(),
            to_version,
        }));
        self.bus.publish(BusEvent::Patch(PatchEvent::VersionUpdated {
            itinerary_id: id.clone(),
            to_version,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itin_model::{
        BudgetTier, ChangeOperation, Cost, Details, Links, Location, NodeId, NodeStatus, NodeType,
        Preferences, Scope, Settings, Timing, Tips,
    };
    use itin_store::InMemoryStore;
    use std::collections::HashMap;

    fn node(id: &str, title: &str) -> itin_model::Node {
        itin_model::Node {
            id: NodeId::from_string(id),
            node_type: NodeType::Attraction,
            title: title.to_string(),
            location: Location::default(),
            timing: Timing::default(),
            cost: Cost::default(),
            details: Details::default(),
            labels: vec![],
            tips: Tips::default(),
            links: Links::default(),
            locked: false,
            status: NodeStatus::Planned,
            updated_by: "skeleton".to_string(),
            updated_at: 0,
            agent_data: HashMap::new(),
        }
    }

    fn itinerary(id: &str) -> Itinerary {
        Itinerary {
            id: ItineraryId::from_string(id),
            version: 1,
            user_id: "u1".to_string(),
            destination: "Tokyo".to_string(),
            start_date: "2025-10-04".to_string(),
            end_date: "2025-10-05".to_string(),
            themes: vec![],
            currency: "USD".to_string(),
            budget_tier: BudgetTier::Medium,
            days: vec![itin_model::Day {
                day_number: 1,
                date: "2025-10-04".to_string(),
                location: None,
                summary: None,
                total_cost: None,
                nodes: vec![node("day1_node1", "Morning Activity")],
                edges: vec![],
            }],
            settings: Settings::default(),
            agents: HashMap::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    fn change_set(ops: Vec<ChangeOperation>) -> ChangeSet {
        ChangeSet {
            scope: Scope::Trip,
            day: None,
            base_version: None,
            idempotency_key: None,
            ops,
            preferences: Preferences::default(),
            reason: Some("test edit".to_string()),
            agent: "editor".to_string(),
        }
    }

    async fn engine_with(id: &str) -> (ChangeEngine<InMemoryStore>, ItineraryId) {
        let store = Arc::new(InMemoryStore::new());
        let itin_id = ItineraryId::from_string(id);
        store.set(&itin_id, itinerary(id)).await.unwrap();
        let bus = Arc::new(EventBus::new());
        let idempotency = Arc::new(IdempotencyCache::new());
        (ChangeEngine::new(store, bus, idempotency), itin_id)
    }

    #[tokio::test]
    async fn apply_persists_and_bumps_version() {
        let (engine, id) = engine_with("trip-1").await;
        let cs = change_set(vec![ChangeOperation::Update {
            id: NodeId::from_string("day1_node1"),
            partial: serde_json::json!({ "title": "Senso-ji Temple" }),
        }]);
        let result = engine.apply(&id, cs).await.unwrap();
        assert_eq!(result.itinerary.version, 2);
        assert_eq!(result.diff.updated.len(), 1);
        assert!(result.revision_id.is_some());
    }

    #[tokio::test]
    async fn propose_does_not_persist() {
        let (engine, id) = engine_with("trip-1").await;
        let cs = change_set(vec![ChangeOperation::Delete { id: NodeId::from_string("day1_node1") }]);
        let proposed = engine.propose(&id, &cs).await.unwrap();
        assert_eq!(proposed.itinerary.version, 2);
        assert!(proposed.revision_id.is_none());

        let stored = engine.store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.days[0].nodes.len(), 1);
    }

    #[tokio::test]
    async fn locked_node_is_rejected_unless_user_first() {
        let (engine, id) = engine_with("trip-1").await;
        {
            let mut doc = engine.store.get(&id).await.unwrap().unwrap();
            doc.days[0].nodes[0].locked = true;
            engine.store.set(&id, doc).await.unwrap();
        }
        let cs = change_set(vec![ChangeOperation::Delete { id: NodeId::from_string("day1_node1") }]);
        let err = engine.apply(&id, cs).await.unwrap_err();
        assert!(matches!(err, ChangeEngineError::NodeLocked(_)));
    }

    #[tokio::test]
    async fn version_conflict_when_base_version_stale() {
        let (engine, id) = engine_with("trip-1").await;
        let mut cs = change_set(vec![ChangeOperation::Delete { id: NodeId::from_string("day1_node1") }]);
        cs.base_version = Some(99);
        let err = engine.apply(&id, cs).await.unwrap_err();
        assert!(matches!(err, ChangeEngineError::VersionConflict));
    }

    #[tokio::test]
    async fn apply_same_idempotency_key_replays_without_reapplying() {
        let (engine, id) = engine_with("trip-1").await;
        let mut cs = change_set(vec![ChangeOperation::Update {
            id: NodeId::from_string("day1_node1"),
            partial: serde_json::json!({ "title": "Senso-ji Temple" }),
        }]);
        cs.idempotency_key = Some("client-key-1".to_string());

        let first = engine.apply(&id, cs.clone()).await.unwrap();
        let second = engine.apply(&id, cs).await.unwrap();
        assert_eq!(first.itinerary.version, second.itinerary.version);

        let stored = engine.store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.version, 2);
    }

    #[tokio::test]
    async fn undo_restores_previous_version() {
        let (engine, id) = engine_with("trip-1").await;
        let cs = change_set(vec![ChangeOperation::Update {
            id: NodeId::from_string("day1_node1"),
            partial: serde_json::json!({ "title": "Senso-ji Temple" }),
        }]);
        engine.apply(&id, cs).await.unwrap();

        let undone = engine.undo(&id, "user-1").await.unwrap();
        assert_eq!(undone.itinerary.version, 3);
        let restored_node = undone.itinerary.days[0].find_node(&NodeId::from_string("day1_node1")).unwrap();
        assert_eq!(restored_node.title, "Morning Activity");
    }

    #[tokio::test]
    async fn empty_ops_with_reason_is_a_noop_apply() {
        let (engine, id) = engine_with("trip-1").await;
        let mut cs = change_set(vec![]);
        cs.reason = Some("Unlock day2_node1 first".to_string());

        let result = engine.apply(&id, cs).await.unwrap();
        assert_eq!(result.itinerary.version, 1);
        assert!(result.diff.is_empty());
        assert!(result.revision_id.is_none());

        let stored = engine.store.get(&id).await.unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert!(engine.store.list_revisions(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_ops_without_reason_is_rejected() {
        let (engine, id) = engine_with("trip-1").await;
        let mut cs = change_set(vec![]);
        cs.reason = None;

        let err = engine.apply(&id, cs).await.unwrap_err();
        assert!(matches!(err, ChangeEngineError::NoOps));
    }
}
