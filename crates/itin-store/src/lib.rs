//! Document store adapter: the out-of-scope persistence collaborator,
//! modeled here as a trait plus an in-memory implementation sufficient to
//! drive the rest of the core in tests and the demo CLI.
//!
//! # Example
//!
//! ```rust,ignore
//! use itin_store::{DocumentStore, InMemoryStore};
//!
//! let store = InMemoryStore::new();
//! store.set(&id, itinerary).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

use async_trait::async_trait;
use dashmap::DashMap;

use itin_model::{Itinerary, ItineraryId, Revision, RevisionId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("itinerary {0} not found")]
    NotFound(ItineraryId),
    #[error("revision {0} not found")]
    RevisionNotFound(RevisionId),
}

/// Writes must be atomic per document; no cross-document transactions are
/// required of an implementation.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, id: &ItineraryId) -> Result<Option<Itinerary>, StoreError>;
    async fn set(&self, id: &ItineraryId, doc: Itinerary) -> Result<(), StoreError>;
    async fn add_revision(&self, id: &ItineraryId, revision: Revision) -> Result<(), StoreError>;
    async fn list_revisions(&self, id: &ItineraryId) -> Result<Vec<Revision>, StoreError>;
    async fn get_revision(
        &self,
        id: &ItineraryId,
        revision_id: &RevisionId,
    ) -> Result<Revision, StoreError>;
    /// Revision lookup by `versionNumber`, used by rollback.
    async fn get_revision_by_version(
        &self,
        id: &ItineraryId,
        version_number: u64,
    ) -> Result<Revision, StoreError>;
}

/// In-memory `DocumentStore`, used by tests and the `demo` CLI subcommand.
/// Not suitable for production (no durability).
#[derive(Default)]
pub struct InMemoryStore {
    docs: DashMap<ItineraryId, Itinerary>,
    revisions: DashMap<ItineraryId, Vec<Revision>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get(&self, id: &ItineraryId) -> Result<Option<Itinerary>, StoreError> {
        Ok(self.docs.get(id).map(|r| r.clone()))
    }

    async fn set(&self, id: &ItineraryId, doc: Itinerary) -> Result<(), StoreError> {
        self.docs.insert(id.clone(), doc);
        Ok(())
    }

    async fn add_revision(&self, id: &ItineraryId, revision: Revision) -> Result<(), StoreError> {
        self.revisions.entry(id.clone()).or_default().push(revision);
        Ok(())
    }

    async fn list_revisions(&self, id: &ItineraryId) -> Result<Vec<Revision>, StoreError> {
        Ok(self.revisions.get(id).map(|r| r.clone()).unwrap_or_default())
    }

    async fn get_revision(
        &self,
        id: &ItineraryId,
        revision_id: &RevisionId,
    ) -> Result<Revision, StoreError> {
        self.revisions
            .get(id)
            .and_then(|revs| revs.iter().find(|r| &r.revision_id == revision_id).cloned())
            .ok_or_else(|| StoreError::RevisionNotFound(revision_id.clone()))
    }

    async fn get_revision_by_version(
        &self,
        id: &ItineraryId,
        version_number: u64,
    ) -> Result<Revision, StoreError> {
        self.revisions
            .get(id)
            .and_then(|revs| revs.iter().find(|r| r.version_number == version_number).cloned())
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use itin_model::{BudgetTier, Diff, Settings};
    use std::collections::HashMap;

    fn sample_itinerary(id: &ItineraryId) -> Itinerary {
        Itinerary {
            id: id.clone(),
            version: 1,
            user_id: "u1".to_string(),
            destination: "Tokyo".to_string(),
            start_date: "2025-10-04".to_string(),
            end_date: "2025-10-06".to_string(),
            themes: vec![],
            currency: "USD".to_string(),
            budget_tier: BudgetTier::Medium,
            days: vec![],
            settings: Settings::default(),
            agents: HashMap::new(),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[tokio::test]
    async fn get_returns_none_before_set() {
        let store = InMemoryStore::new();
        let id = ItineraryId::from_string("trip-1");
        assert!(store.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_then_get_round_trips() {
        let store = InMemoryStore::new();
        let id = ItineraryId::from_string("trip-1");
        store.set(&id, sample_itinerary(&id)).await.unwrap();
        let loaded = store.get(&id).await.unwrap().unwrap();
        assert_eq!(loaded.id, id);
    }

    #[tokio::test]
    async fn revisions_are_appended_and_queryable_by_version() {
        let store = InMemoryStore::new();
        let id = ItineraryId::from_string("trip-1");
        let doc = sample_itinerary(&id);
        let revision = Revision {
            revision_id: itin_model::RevisionId::default(),
            itinerary_id: id.clone(),
            version_number: 1,
            created_by: "change-engine".to_string(),
            created_at: 0,
            description: None,
            change_count: 1,
            snapshot: doc,
            diff: Diff::default(),
        };
        store.add_revision(&id, revision.clone()).await.unwrap();
        let found = store.get_revision_by_version(&id, 1).await.unwrap();
        assert_eq!(found.revision_id, revision.revision_id);
        assert_eq!(store.list_revisions(&id).await.unwrap().len(), 1);
    }
}
