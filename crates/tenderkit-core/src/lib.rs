//! # tenderkit-core
//!
//! The tender composition engine for tenderkit.
//!
//! A tender is assembled by picking sub-criteria from a fixed catalog,
//! ordering them at two levels (categories, then sub-criteria within each
//! category) and exporting the result to PDF, word-processor, spreadsheet
//! and canonical JSON documents that all carry the same content in the same
//! order.
//!
//! ## Layout
//!
//! - `catalog`: read-only criteria reference data, partitioned by sector
//! - `composition` + `reorder`: the ordered selection and its mutations
//! - `traversal` + `export`: one resolve pass feeding every encoder
//! - `formats` + `storage` + `session`: snapshot persistence
//! - `history`: statistics over saved snapshots
//!
//! ## Architectural Constraints
//!
//! - Synchronous, no network dependencies
//! - `BTreeMap` only, no floating point
//! - A failing mutation leaves the composition untouched

// =============================================================================
// MODULES
// =============================================================================

pub mod catalog;
pub mod composition;
pub mod export;
pub mod formats;
pub mod history;
pub mod primitives;
pub mod reorder;
pub mod session;
pub mod storage;
pub mod traversal;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{CategoryId, OwnerId, SectorId, SnapshotId, SubIndex, TenderError};

// =============================================================================
// RE-EXPORTS: Composition Engine
// =============================================================================

pub use catalog::{Catalog, CatalogProvider, Category, Sector, Subcriterion};
pub use composition::Composition;
pub use reorder::{ReorderEngine, Toggle};
pub use traversal::{Entry, Section, TenderDocument};

// =============================================================================
// RE-EXPORTS: Export
// =============================================================================

pub use export::{
    CanonicalTender, ConsistencyReport, DocumentCodec, ExportArtifact, ExportFormat, FormatCheck,
    Renderer, decode_entries, import_canonical, verify_consistency,
};

// =============================================================================
// RE-EXPORTS: Persistence
// =============================================================================

pub use formats::{PersistenceHeader, snapshot_from_bytes, snapshot_to_bytes};
pub use history::{HistoryStats, SectorUsage};
pub use session::{Session, StorageBackend};
pub use storage::{MemoryStore, RedbStore, Snapshot, SnapshotStore, SnapshotSummary};
