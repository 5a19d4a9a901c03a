//! # Snapshot Storage
//!
//! The persistence gateway: named, timestamped, immutable copies of a
//! composition, scoped by owner.
//!
//! Backends:
//! - [`MemoryStore`]: volatile, for tests and one-shot runs
//! - [`RedbStore`]: disk-backed ACID storage

mod redb_store;

pub use redb_store::RedbStore;

use crate::{Composition, OwnerId, SectorId, SnapshotId, TenderError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// A persisted composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub owner: OwnerId,
    pub composition: Composition,
}

impl Snapshot {
    #[must_use]
    pub fn summary(&self) -> SnapshotSummary {
        SnapshotSummary {
            id: self.id,
            title: self.composition.title().to_string(),
            sector: self.composition.sector().clone(),
            is_draft: self.composition.is_draft(),
            created_at: self.composition.created_at(),
            category_count: self.composition.category_count(),
            selected_count: self.composition.selected_count(),
        }
    }
}

/// History listing row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub id: SnapshotId,
    pub title: String,
    pub sector: SectorId,
    pub is_draft: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub category_count: usize,
    pub selected_count: usize,
}

/// Newest first; equal timestamps by id, highest first.
pub(crate) fn sort_newest_first(snapshots: &mut [Snapshot]) {
    snapshots.sort_by(|a, b| {
        b.composition
            .created_at()
            .cmp(&a.composition.created_at())
            .then(b.id.cmp(&a.id))
    });
}

// =============================================================================
// GATEWAY TRAIT
// =============================================================================

/// Snapshot persistence.
///
/// Every call is a single request with a success-or-error outcome. A failed
/// call leaves nothing half-written.
pub trait SnapshotStore {
    /// Store an immutable copy and return its new id. A composition without
    /// a save time is stamped with the current time.
    fn save(&mut self, owner: &OwnerId, composition: &Composition) -> Result<SnapshotId, TenderError>;

    /// Every snapshot of `owner`, newest first.
    fn snapshots(&self, owner: &OwnerId) -> Result<Vec<Snapshot>, TenderError>;

    /// Fetch one snapshot by id, whoever owns it.
    fn load(&self, id: SnapshotId) -> Result<Snapshot, TenderError>;

    /// Remove one snapshot.
    fn delete(&mut self, id: SnapshotId) -> Result<(), TenderError>;

    /// History listing for `owner`, newest first.
    fn list(&self, owner: &OwnerId) -> Result<Vec<SnapshotSummary>, TenderError> {
        Ok(self
            .snapshots(owner)?
            .iter()
            .map(Snapshot::summary)
            .collect())
    }
}

fn stamped(composition: &Composition) -> Composition {
    let mut copy = composition.clone();
    if copy.created_at().is_none() {
        copy.set_created_at(Utc::now());
    }
    copy
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// In-memory snapshot store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    snapshots: BTreeMap<SnapshotId, Snapshot>,
    next_id: u64,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&mut self, owner: &OwnerId, composition: &Composition) -> Result<SnapshotId, TenderError> {
        self.next_id = self.next_id.checked_add(1).ok_or_else(|| {
            TenderError::PersistenceFailure("snapshot id space exhausted".to_string())
        })?;
        let id = SnapshotId(self.next_id);
        self.snapshots.insert(
            id,
            Snapshot {
                id,
                owner: owner.clone(),
                composition: stamped(composition),
            },
        );
        Ok(id)
    }

    fn snapshots(&self, owner: &OwnerId) -> Result<Vec<Snapshot>, TenderError> {
        let mut owned: Vec<Snapshot> = self
            .snapshots
            .values()
            .filter(|s| s.owner == *owner)
            .cloned()
            .collect();
        sort_newest_first(&mut owned);
        Ok(owned)
    }

    fn load(&self, id: SnapshotId) -> Result<Snapshot, TenderError> {
        self.snapshots
            .get(&id)
            .cloned()
            .ok_or(TenderError::SnapshotNotFound(id))
    }

    fn delete(&mut self, id: SnapshotId) -> Result<(), TenderError> {
        self.snapshots
            .remove(&id)
            .map(|_| ())
            .ok_or(TenderError::SnapshotNotFound(id))
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn composition(title: &str, day: u32) -> Composition {
        let mut composition = Composition::new(SectorId::new("it"));
        composition.set_title(title);
        composition.set_created_at(Utc.with_ymd_and_hms(2025, 7, day, 9, 0, 0).single().unwrap());
        composition
    }

    #[test]
    fn ids_are_monotonic() {
        let mut store = MemoryStore::new();
        let owner = OwnerId::new("alice");
        let a = store.save(&owner, &composition("a", 1)).unwrap();
        let b = store.save(&owner, &composition("b", 1)).unwrap();
        store.delete(b).unwrap();
        let c = store.save(&owner, &composition("c", 1)).unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn list_is_newest_first_and_owner_scoped() {
        let mut store = MemoryStore::new();
        let alice = OwnerId::new("alice");
        let bob = OwnerId::new("bob");
        store.save(&alice, &composition("old", 1)).unwrap();
        store.save(&alice, &composition("new", 20)).unwrap();
        store.save(&alice, &composition("same day later id", 20)).unwrap();
        store.save(&bob, &composition("bob's", 25)).unwrap();

        let titles: Vec<String> = store
            .list(&alice)
            .unwrap()
            .into_iter()
            .map(|s| s.title)
            .collect();
        assert_eq!(titles, vec!["same day later id", "new", "old"]);
        assert_eq!(store.list(&bob).unwrap().len(), 1);
        assert!(store.list(&OwnerId::new("carol")).unwrap().is_empty());
    }

    #[test]
    fn save_stamps_missing_time() {
        let mut store = MemoryStore::new();
        let owner = OwnerId::new("alice");
        let unsaved = Composition::new(SectorId::new("it"));
        let id = store.save(&owner, &unsaved).unwrap();
        assert!(store.load(id).unwrap().composition.created_at().is_some());
        assert!(unsaved.created_at().is_none());
    }

    #[test]
    fn missing_ids_are_not_found() {
        let mut store = MemoryStore::new();
        assert!(matches!(
            store.load(SnapshotId(9)),
            Err(TenderError::SnapshotNotFound(SnapshotId(9)))
        ));
        assert!(store.delete(SnapshotId(9)).unwrap_err().is_not_found());
    }
}
