//! # redb-backed Snapshot Storage
//!
//! Snapshots live in one table keyed by id, each value in the
//! [persistence format](crate::formats). Ids come from a counter in the
//! metadata table and are never reused, even after a delete.
//!
//! Every gateway call runs in its own transaction: a save either commits
//! the snapshot and the counter together or neither.

use super::{Snapshot, SnapshotStore, sort_newest_first, stamped};
use crate::formats::{snapshot_from_bytes, snapshot_to_bytes};
use crate::{Composition, OwnerId, SnapshotId, TenderError};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::fmt::Display;
use std::path::Path;

/// Table for snapshots: SnapshotId(u64) -> header + postcard bytes
const SNAPSHOTS: TableDefinition<u64, &[u8]> = TableDefinition::new("snapshots");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const LAST_ID_KEY: &str = "last_snapshot_id";

fn store_error(e: impl Display) -> TenderError {
    TenderError::PersistenceFailure(e.to_string())
}

/// A disk-backed snapshot store.
pub struct RedbStore {
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create a snapshot database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TenderError> {
        let db = Database::create(path.as_ref()).map_err(store_error)?;

        let write_txn = db.begin_write().map_err(store_error)?;
        {
            let _ = write_txn.open_table(SNAPSHOTS).map_err(store_error)?;
            let _ = write_txn.open_table(METADATA).map_err(store_error)?;
        }
        write_txn.commit().map_err(store_error)?;

        tracing::debug!(path = %path.as_ref().display(), "Opened snapshot store");
        Ok(Self { db })
    }
}

impl SnapshotStore for RedbStore {
    fn save(&mut self, owner: &OwnerId, composition: &Composition) -> Result<SnapshotId, TenderError> {
        let write_txn = self.db.begin_write().map_err(store_error)?;
        let id = {
            let mut metadata = write_txn.open_table(METADATA).map_err(store_error)?;
            let last = metadata
                .get(LAST_ID_KEY)
                .map_err(store_error)?
                .map(|v| v.value())
                .unwrap_or(0);
            let id = last
                .checked_add(1)
                .ok_or_else(|| store_error("snapshot id space exhausted"))?;

            let snapshot = Snapshot {
                id: SnapshotId(id),
                owner: owner.clone(),
                composition: stamped(composition),
            };
            let bytes = snapshot_to_bytes(&snapshot)?;

            let mut snapshots = write_txn.open_table(SNAPSHOTS).map_err(store_error)?;
            snapshots
                .insert(id, bytes.as_slice())
                .map_err(store_error)?;
            metadata.insert(LAST_ID_KEY, id).map_err(store_error)?;
            id
        };
        write_txn.commit().map_err(store_error)?;

        Ok(SnapshotId(id))
    }

    fn snapshots(&self, owner: &OwnerId) -> Result<Vec<Snapshot>, TenderError> {
        let read_txn = self.db.begin_read().map_err(store_error)?;
        let table = read_txn.open_table(SNAPSHOTS).map_err(store_error)?;

        let mut owned = Vec::new();
        for entry in table.iter().map_err(store_error)? {
            let (_, value) = entry.map_err(store_error)?;
            let snapshot = snapshot_from_bytes(value.value())?;
            if snapshot.owner == *owner {
                owned.push(snapshot);
            }
        }
        sort_newest_first(&mut owned);
        Ok(owned)
    }

    fn load(&self, id: SnapshotId) -> Result<Snapshot, TenderError> {
        let read_txn = self.db.begin_read().map_err(store_error)?;
        let table = read_txn.open_table(SNAPSHOTS).map_err(store_error)?;
        let value = table
            .get(id.0)
            .map_err(store_error)?
            .ok_or(TenderError::SnapshotNotFound(id))?;
        snapshot_from_bytes(value.value())
    }

    fn delete(&mut self, id: SnapshotId) -> Result<(), TenderError> {
        let write_txn = self.db.begin_write().map_err(store_error)?;
        let removed = {
            let mut table = write_txn.open_table(SNAPSHOTS).map_err(store_error)?;
            table.remove(id.0).map_err(store_error)?.is_some()
        };
        if !removed {
            write_txn.abort().map_err(store_error)?;
            return Err(TenderError::SnapshotNotFound(id));
        }
        write_txn.commit().map_err(store_error)
    }
}
