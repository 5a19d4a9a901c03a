//! # Reorder Engine
//!
//! Every mutation of a [`Composition`] goes through here.
//!
//! Each operation:
//! - validates its preconditions before touching the model
//! - applies fully or not at all
//! - keeps `category_order` and `selection` in lockstep
//!
//! Moves clamp the target position to the last valid index and treat a
//! move onto the current position as a no-op.

use crate::primitives::MAX_CATEGORIES;
use crate::{CategoryId, Composition, SubIndex, TenderError};

/// Outcome of a toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// The reference was appended to the category's order.
    Selected,
    /// The reference was removed; the category is still present.
    Deselected,
    /// The reference was the category's last; the category is gone.
    CategoryRemoved,
}

/// The ReorderEngine holds the composition mutation operations.
pub struct ReorderEngine;

impl ReorderEngine {
    /// Select or deselect one sub-criterion.
    ///
    /// Selecting appends to the category's order, creating the category
    /// at the end of `category_order` on its first selection. Deselecting
    /// the last reference removes the category from both structures.
    pub fn toggle_subcriterion(
        composition: &mut Composition,
        category: &CategoryId,
        index: SubIndex,
    ) -> Result<Toggle, TenderError> {
        Self::ensure_consistent(composition, category)?;

        let Some(refs) = composition.selection.get_mut(category) else {
            if composition.category_order.len() >= MAX_CATEGORIES {
                return Err(TenderError::InvalidOperation(format!(
                    "composition already holds the maximum of {} categories",
                    MAX_CATEGORIES
                )));
            }
            composition.selection.insert(category.clone(), vec![index]);
            composition.category_order.push(category.clone());
            return Ok(Toggle::Selected);
        };

        match refs.iter().position(|r| *r == index) {
            None => {
                refs.push(index);
                Ok(Toggle::Selected)
            }
            Some(_) if refs.len() == 1 => {
                composition.selection.remove(category);
                composition.category_order.retain(|id| id != category);
                Ok(Toggle::CategoryRemoved)
            }
            Some(position) => {
                refs.remove(position);
                Ok(Toggle::Deselected)
            }
        }
    }

    /// Relocate a category within the top-level order.
    pub fn move_category(
        composition: &mut Composition,
        category: &CategoryId,
        to_position: usize,
    ) -> Result<(), TenderError> {
        Self::ensure_consistent(composition, category)?;
        let from = composition
            .category_order
            .iter()
            .position(|id| id == category)
            .ok_or_else(|| TenderError::CategoryNotFound(category.clone()))?;

        move_within(&mut composition.category_order, from, to_position);
        Ok(())
    }

    /// Relocate one reference within its own category's order.
    pub fn move_subcriterion(
        composition: &mut Composition,
        category: &CategoryId,
        from_ref: SubIndex,
        to_position: usize,
    ) -> Result<(), TenderError> {
        Self::ensure_consistent(composition, category)?;
        let refs = composition
            .selection
            .get_mut(category)
            .ok_or_else(|| TenderError::CategoryNotFound(category.clone()))?;
        let from = refs
            .iter()
            .position(|r| *r == from_ref)
            .ok_or_else(|| TenderError::SubcriterionNotFound(category.clone(), from_ref))?;

        move_within(refs, from, to_position);
        Ok(())
    }

    /// Drop a category and all of its references.
    pub fn remove_category(
        composition: &mut Composition,
        category: &CategoryId,
    ) -> Result<(), TenderError> {
        Self::ensure_consistent(composition, category)?;
        if composition.selection.remove(category).is_none() {
            return Err(TenderError::CategoryNotFound(category.clone()));
        }
        composition.category_order.retain(|id| id != category);
        Ok(())
    }

    /// Reset to an empty selection. Sector, title and flags are kept.
    pub fn clear_all(composition: &mut Composition) {
        composition.selection.clear();
        composition.category_order.clear();
    }

    /// Reorder categories by a priority list (a sector template).
    ///
    /// Listed categories come first, in list order; unlisted ones follow
    /// in their current relative order. Sub-criteria orders are untouched.
    pub fn arrange_by_priority(composition: &mut Composition, priority: &[CategoryId]) {
        composition.category_order.sort_by_key(|id| {
            priority
                .iter()
                .position(|p| p == id)
                .unwrap_or(priority.len())
        });
    }

    /// A category must be in both structures or in neither.
    fn ensure_consistent(
        composition: &Composition,
        category: &CategoryId,
    ) -> Result<(), TenderError> {
        let selected = composition.selection.contains_key(category);
        let ordered = composition.category_order.contains(category);
        if selected != ordered {
            return Err(TenderError::InvalidOperation(format!(
                "category {} is inconsistent: selected={}, ordered={}",
                category, selected, ordered
            )));
        }
        Ok(())
    }
}

/// Move `items[from]` to `to`, clamped to the last index.
fn move_within<T>(items: &mut Vec<T>, from: usize, to: usize) {
    let target = to.min(items.len().saturating_sub(1));
    if target == from {
        return;
    }
    let item = items.remove(from);
    items.insert(target, item);
}

// =============================================================================
// TESTS
// =============================================================================
