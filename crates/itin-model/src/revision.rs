//! Append-only revision records.

use serde::{Deserialize, Serialize};

use crate::change::Diff;
use crate::ids::{ItineraryId, RevisionId};
use crate::itinerary::Itinerary;

/// An immutable record of a past document state plus the diff that
/// produced the *next* state. Never rewritten once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub revision_id: RevisionId,
    pub itinerary_id: ItineraryId,
    pub version_number: u64,
    pub created_by: String,
    pub created_at: i64,
    pub description: Option<String>,
    pub change_count: usize,
    /// Full pre-apply document.
    pub snapshot: Itinerary,
    pub diff: Diff,
}

impl Revision {
    /// Content hash of the snapshot, used to detect accidental tampering
    /// with stored revisions (the store adapter is trusted, but a cheap
    /// fingerprint costs little and doubles as a stable sort/compare key
    /// in tests).
    #[must_use]
    pub fn snapshot_hash(&self) -> [u8; 32] {
        let bytes = serde_json::to_vec(&self.snapshot).unwrap_or_default();
        *blake3::hash(&bytes).as_bytes()
    }
}
