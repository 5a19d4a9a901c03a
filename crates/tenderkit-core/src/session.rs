//! # Session Module
//!
//! One user's editing session: the composition being edited plus the
//! snapshot store it is saved to.
//!
//! The editing composition is never touched by a failed persistence call,
//! so the caller can retry without losing work.
//!
//! ## Storage Backends
//!
//! - `InMemory`: [`MemoryStore`], volatile
//! - `Persistent`: [`RedbStore`], disk-backed ACID storage

use crate::history::HistoryStats;
use crate::storage::{MemoryStore, RedbStore, Snapshot, SnapshotStore, SnapshotSummary};
use crate::traversal::default_title;
use crate::{Composition, OwnerId, SnapshotId, TenderError};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Storage backend for a Session.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

impl SnapshotStore for StorageBackend {
    fn save(&mut self, owner: &OwnerId, composition: &Composition) -> Result<SnapshotId, TenderError> {
        match self {
            Self::InMemory(store) => store.save(owner, composition),
            Self::Persistent(store) => store.save(owner, composition),
        }
    }

    fn snapshots(&self, owner: &OwnerId) -> Result<Vec<Snapshot>, TenderError> {
        match self {
            Self::InMemory(store) => store.snapshots(owner),
            Self::Persistent(store) => store.snapshots(owner),
        }
    }

    fn load(&self, id: SnapshotId) -> Result<Snapshot, TenderError> {
        match self {
            Self::InMemory(store) => store.load(id),
            Self::Persistent(store) => store.load(id),
        }
    }

    fn delete(&mut self, id: SnapshotId) -> Result<(), TenderError> {
        match self {
            Self::InMemory(store) => store.delete(id),
            Self::Persistent(store) => store.delete(id),
        }
    }
}

/// An editing session.
#[derive(Debug)]
pub struct Session<S: SnapshotStore = StorageBackend> {
    owner: OwnerId,
    composition: Composition,
    store: S,
}

impl Session<StorageBackend> {
    /// Session with a volatile store.
    #[must_use]
    pub fn in_memory(owner: OwnerId, composition: Composition) -> Self {
        Self::new(owner, composition, StorageBackend::default())
    }

    /// Session with a redb store at `path`, created if missing.
    pub fn with_redb(
        owner: OwnerId,
        composition: Composition,
        path: impl AsRef<Path>,
    ) -> Result<Self, TenderError> {
        let store = RedbStore::open(path)?;
        Ok(Self::new(owner, composition, StorageBackend::Persistent(store)))
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.store, StorageBackend::Persistent(_))
    }
}

impl<S: SnapshotStore> Session<S> {
    #[must_use]
    pub fn new(owner: OwnerId, composition: Composition, store: S) -> Self {
        Self {
            owner,
            composition,
            store,
        }
    }

    #[must_use]
    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    /// The composition being edited.
    #[must_use]
    pub fn composition(&self) -> &Composition {
        &self.composition
    }

    /// Mutable access for [`ReorderEngine`](crate::ReorderEngine) operations.
    pub fn composition_mut(&mut self) -> &mut Composition {
        &mut self.composition
    }

    /// Give up the session, keeping the composition.
    #[must_use]
    pub fn into_composition(self) -> Composition {
        self.composition
    }

    /// Save an immutable copy stamped with the current time.
    pub fn save(&mut self, title: &str, is_draft: bool) -> Result<SnapshotId, TenderError> {
        self.save_at(title, is_draft, Utc::now())
    }

    /// Save an immutable copy stamped with `at`.
    ///
    /// An empty title becomes `Tender YYYY-MM-DD`. On success the editing
    /// composition takes the saved title and draft flag; on failure it is
    /// left exactly as it was.
    pub fn save_at(
        &mut self,
        title: &str,
        is_draft: bool,
        at: DateTime<Utc>,
    ) -> Result<SnapshotId, TenderError> {
        self.composition.validate()?;

        let title = match title.trim() {
            "" => default_title(at),
            trimmed => trimmed.to_string(),
        };
        let mut copy = self.composition.clone();
        copy.set_title(title.clone());
        copy.set_draft(is_draft);
        copy.set_created_at(at);

        let id = self.store.save(&self.owner, &copy)?;
        tracing::info!(
            id = %id,
            owner = self.owner.as_str(),
            categories = copy.category_count(),
            draft = is_draft,
            "Saved snapshot"
        );

        self.composition.set_title(title);
        self.composition.set_draft(is_draft);
        Ok(id)
    }

    /// Replace the editing composition with a saved one.
    ///
    /// Snapshots of other owners are reported as not found.
    pub fn open(&mut self, id: SnapshotId) -> Result<(), TenderError> {
        let snapshot = self.owned(id)?;
        snapshot.composition.validate()?;
        tracing::debug!(id = %id, "Opened snapshot");
        self.composition = snapshot.composition;
        Ok(())
    }

    /// This owner's snapshots, newest first.
    pub fn history(&self) -> Result<Vec<SnapshotSummary>, TenderError> {
        self.store.list(&self.owner)
    }

    /// Delete one of this owner's snapshots.
    pub fn delete(&mut self, id: SnapshotId) -> Result<(), TenderError> {
        self.owned(id)?;
        self.store.delete(id)?;
        tracing::info!(id = %id, owner = self.owner.as_str(), "Deleted snapshot");
        Ok(())
    }

    /// History statistics as of `now`.
    pub fn stats(&self, now: DateTime<Utc>) -> Result<HistoryStats, TenderError> {
        let snapshots = self.store.snapshots(&self.owner)?;
        Ok(HistoryStats::compute(&snapshots, now))
    }

    fn owned(&self, id: SnapshotId) -> Result<Snapshot, TenderError> {
        let snapshot = self.store.load(id)?;
        if snapshot.owner != self.owner {
            return Err(TenderError::SnapshotNotFound(id));
        }
        Ok(snapshot)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{CategoryId, ReorderEngine, SectorId, SubIndex};
    use chrono::TimeZone;
    use tempfile::tempdir;

    /// A store whose saves always fail.
    #[derive(Debug, Default)]
    struct FailingStore;

    impl SnapshotStore for FailingStore {
        fn save(&mut self, _: &OwnerId, _: &Composition) -> Result<SnapshotId, TenderError> {
            Err(TenderError::PersistenceFailure("disk full".to_string()))
        }
        fn snapshots(&self, _: &OwnerId) -> Result<Vec<Snapshot>, TenderError> {
            Ok(Vec::new())
        }
        fn load(&self, id: SnapshotId) -> Result<Snapshot, TenderError> {
            Err(TenderError::SnapshotNotFound(id))
        }
        fn delete(&mut self, id: SnapshotId) -> Result<(), TenderError> {
            Err(TenderError::SnapshotNotFound(id))
        }
    }

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, 15, 14, 0, 0).single().unwrap()
    }

    fn composition() -> Composition {
        let mut composition = Composition::new(SectorId::new("it"));
        for (id, index) in [("C2", 1), ("C1", 0), ("C1", 2)] {
            ReorderEngine::toggle_subcriterion(&mut composition, &CategoryId::new(id), SubIndex(index))
                .unwrap();
        }
        composition
    }

    #[test]
    fn save_defaults_title_and_keeps_order() {
        let mut session = Session::in_memory(OwnerId::new("alice"), composition());
        let id = session.save_at("  ", false, at()).unwrap();

        assert_eq!(session.composition().title(), "Tender 2025-08-15");
        assert!(!session.composition().is_draft());

        let history = session.history().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, id);
        assert_eq!(history[0].title, "Tender 2025-08-15");
        assert_eq!(history[0].created_at, Some(at()));
    }

    #[test]
    fn failed_save_leaves_composition_untouched() {
        let mut session = Session::new(OwnerId::new("alice"), composition(), FailingStore);
        let before = session.composition().clone();

        let result = session.save_at("Final", false, at());
        assert!(matches!(result, Err(TenderError::PersistenceFailure(_))));
        assert_eq!(session.composition(), &before);
    }

    #[test]
    fn invalid_composition_is_not_saved() {
        let mut broken = composition();
        broken.category_order.pop();
        let mut session = Session::in_memory(OwnerId::new("alice"), broken);

        assert!(matches!(
            session.save_at("x", true, at()),
            Err(TenderError::InvalidOperation(_))
        ));
        assert!(session.history().unwrap().is_empty());
    }

    #[test]
    fn open_restores_saved_order() {
        let mut session = Session::in_memory(OwnerId::new("alice"), composition());
        let id = session.save_at("Saved", true, at()).unwrap();

        ReorderEngine::clear_all(session.composition_mut());
        assert!(session.composition().is_empty());

        session.open(id).unwrap();
        let order: Vec<&str> = session
            .composition()
            .category_order()
            .iter()
            .map(CategoryId::as_str)
            .collect();
        assert_eq!(order, vec!["C2", "C1"]);
        assert_eq!(
            session.composition().subcriteria_order(&CategoryId::new("C1")),
            &[SubIndex(0), SubIndex(2)]
        );
        assert_eq!(session.composition().created_at(), Some(at()));
    }

    #[test]
    fn other_owners_snapshots_are_invisible() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("s.redb");

        let id = {
            let mut alice = Session::with_redb(OwnerId::new("alice"), composition(), &path).unwrap();
            assert!(alice.is_persistent());
            alice.save_at("Alice's", false, at()).unwrap()
        };

        let mut bob =
            Session::with_redb(OwnerId::new("bob"), Composition::new(SectorId::new("it")), &path)
                .unwrap();
        assert!(bob.history().unwrap().is_empty());
        assert!(matches!(bob.open(id), Err(TenderError::SnapshotNotFound(_))));
        assert!(matches!(bob.delete(id), Err(TenderError::SnapshotNotFound(_))));
        assert!(bob.composition().is_empty());
    }

    #[test]
    fn delete_and_stats() {
        let mut session = Session::in_memory(OwnerId::new("alice"), composition());
        let first = session.save_at("one", true, at()).unwrap();
        session.save_at("two", false, at()).unwrap();

        let stats = session.stats(at()).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.drafts, 1);
        assert_eq!(stats.last_7_days, 2);

        session.delete(first).unwrap();
        assert_eq!(session.history().unwrap().len(), 1);
        assert_eq!(session.stats(at()).unwrap().total, 1);
    }
}
