//! # Core Type Definitions
//!
//! This module contains the identifier and error types shared by every
//! tenderkit module:
//! - Reference identifiers (`SectorId`, `CategoryId`, `SubIndex`)
//! - Persistence identifiers (`SnapshotId`, `OwnerId`)
//! - Error types (`TenderError`)
//!
//! ## Ordering Guarantees
//!
//! All identifiers implement `Ord` so they can key `BTreeMap`/`BTreeSet`
//! with deterministic iteration order.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// CATALOG REFERENCES
// =============================================================================

/// Identifier of a catalog partition (e.g. `"it"`, `"healthcare"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectorId(pub String);

impl SectorId {
    /// Create a new sector identifier.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stable identifier of a catalog category (e.g. `"C4"`, `"IT2"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub String);

impl CategoryId {
    /// Create a new category identifier.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Positional reference to a sub-criterion inside its catalog category.
///
/// The index is resolved against the catalog at render time only, so a
/// composition keeps references the catalog no longer has.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct SubIndex(pub usize);

impl SubIndex {
    /// Get the raw positional index.
    #[must_use]
    pub const fn value(self) -> usize {
        self.0
    }
}

impl fmt::Display for SubIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// PERSISTENCE IDENTIFIERS
// =============================================================================

/// Identifier assigned to a snapshot by the persistence gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub u64);

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The user a snapshot belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl OwnerId {
    /// Create a new owner identifier.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in tenderkit.
///
/// - No silent failures, except catalog misses during rendering which are
///   logged and skipped
/// - A failing reorder operation leaves the composition untouched
/// - Persistence failures leave the editing composition untouched
#[derive(Debug, Error)]
pub enum TenderError {
    /// The mutation would violate a composition invariant.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The category is not part of the composition.
    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// The sub-criterion reference is not selected for the category.
    #[error("Sub-criterion {1} not found in category {0}")]
    SubcriterionNotFound(CategoryId, SubIndex),

    /// No snapshot with this id is visible to the caller.
    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(SnapshotId),

    /// A reference does not resolve against the catalog.
    #[error("Catalog has no entry for {}", describe_reference(.0, .1, .2))]
    CatalogMismatch(SectorId, CategoryId, Option<SubIndex>),

    /// The persistence gateway failed.
    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration or catalog data is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl TenderError {
    /// True for the three `NotFound` shapes.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::CategoryNotFound(_) | Self::SubcriterionNotFound(..) | Self::SnapshotNotFound(_)
        )
    }
}

fn describe_reference(sector: &SectorId, category: &CategoryId, sub: &Option<SubIndex>) -> String {
    match sub {
        Some(index) => format!("{}/{}[{}]", sector, category, index),
        None => format!("{}/{}", sector, category),
    }
}

// =============================================================================
// TESTS
// =============================================================================
