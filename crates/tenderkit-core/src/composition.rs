//! # Composition Model
//!
//! The user-built, ordered selection of categories and sub-criteria.
//!
//! Two structures carry the ordering:
//! - `selection`: category -> ordered sub-criterion references. The map's own
//!   iteration order carries no meaning.
//! - `category_order`: the authoritative top-level display order.
//!
//! ## Invariants
//!
//! 1. `category_order` is exactly the key set of `selection`, no repeats
//! 2. No category in `selection` has an empty reference list
//! 3. References within one category are unique
//!
//! Catalog resolution is NOT an invariant: references are kept even when
//! the catalog no longer has them and are dropped at render time.
//!
//! All mutation goes through [`ReorderEngine`](crate::ReorderEngine).

use crate::{CategoryId, SectorId, SubIndex, TenderError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A tender composition.
///
/// Deserialization is tolerant; anything loaded from outside the process
/// should be checked with [`Composition::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub(crate) sector: SectorId,
    #[serde(default)]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) selection: BTreeMap<CategoryId, Vec<SubIndex>>,
    #[serde(default)]
    pub(crate) category_order: Vec<CategoryId>,
    #[serde(default)]
    pub(crate) is_draft: bool,
    #[serde(default)]
    pub(crate) created_at: Option<DateTime<Utc>>,
}

impl Composition {
    /// Create an empty composition for a sector.
    #[must_use]
    pub fn new(sector: SectorId) -> Self {
        Self {
            sector,
            title: String::new(),
            selection: BTreeMap::new(),
            category_order: Vec::new(),
            is_draft: true,
            created_at: None,
        }
    }

    /// The catalog partition this composition resolves against.
    #[must_use]
    pub fn sector(&self) -> &SectorId {
        &self.sector
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    #[must_use]
    pub fn is_draft(&self) -> bool {
        self.is_draft
    }

    pub fn set_draft(&mut self, is_draft: bool) {
        self.is_draft = is_draft;
    }

    /// Save time, set by the persistence gateway.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn set_created_at(&mut self, at: DateTime<Utc>) {
        self.created_at = Some(at);
    }

    /// Top-level display order.
    #[must_use]
    pub fn category_order(&self) -> &[CategoryId] {
        &self.category_order
    }

    /// Display order of one category's references. Empty when the category
    /// is not selected.
    #[must_use]
    pub fn subcriteria_order(&self, category: &CategoryId) -> &[SubIndex] {
        self.selection
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_selected(&self, category: &CategoryId, index: SubIndex) -> bool {
        self.subcriteria_order(category).contains(&index)
    }

    /// The raw selection map.
    #[must_use]
    pub fn selection(&self) -> &BTreeMap<CategoryId, Vec<SubIndex>> {
        &self.selection
    }

    /// Number of selected categories.
    #[must_use]
    pub fn category_count(&self) -> usize {
        self.category_order.len()
    }

    /// Number of selected sub-criteria across all categories.
    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.selection.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.selection.is_empty() && self.category_order.is_empty()
    }

    /// Check the three structural invariants.
    ///
    /// Returns `TenderError::InvalidOperation` describing the first
    /// violation found.
    pub fn validate(&self) -> Result<(), TenderError> {
        let mut seen = BTreeSet::new();
        for id in &self.category_order {
            if !seen.insert(id) {
                return Err(TenderError::InvalidOperation(format!(
                    "category {} appears twice in the category order",
                    id
                )));
            }
            if !self.selection.contains_key(id) {
                return Err(TenderError::InvalidOperation(format!(
                    "category {} is ordered but has no selection",
                    id
                )));
            }
        }

        for (id, refs) in &self.selection {
            if !seen.contains(id) {
                return Err(TenderError::InvalidOperation(format!(
                    "category {} is selected but missing from the category order",
                    id
                )));
            }
            if refs.is_empty() {
                return Err(TenderError::InvalidOperation(format!(
                    "category {} has no selected sub-criteria",
                    id
                )));
            }
            let mut unique = BTreeSet::new();
            if let Some(dup) = refs.iter().find(|r| !unique.insert(**r)) {
                return Err(TenderError::InvalidOperation(format!(
                    "sub-criterion {} is selected twice in category {}",
                    dup, id
                )));
            }
        }

        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
