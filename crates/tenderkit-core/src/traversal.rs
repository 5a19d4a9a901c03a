//! # Traversal
//!
//! The one walk over a composition that every export format consumes.
//!
//! ```text
//! for category in composition.category_order:
//!     skip if the catalog has no such category
//!     emit heading
//!     for index in composition.subcriteria_order(category):
//!         skip if the catalog category has no such index
//!         emit label + description
//! ```
//!
//! Catalog misses are logged and skipped; they never fail the traversal.

use crate::catalog::{CatalogProvider, Subcriterion};
use crate::{CategoryId, Composition, SectorId, TenderError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One resolved category with its resolved entries, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: CategoryId,
    pub title: String,
    pub entries: Vec<Subcriterion>,
}

/// The flat `(category title, label, description)` triple every format
/// must reproduce in the same order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Entry {
    pub category: String,
    pub label: String,
    pub description: String,
}

impl Entry {
    #[must_use]
    pub fn new(
        category: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            label: label.into(),
            description: description.into(),
        }
    }
}

/// A composition resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenderDocument {
    pub title: String,
    pub sector: SectorId,
    pub sector_name: String,
    pub generated_at: DateTime<Utc>,
    pub sections: Vec<Section>,
}

impl TenderDocument {
    /// Flatten to the ordered triple sequence.
    #[must_use]
    pub fn entries(&self) -> Vec<Entry> {
        self.sections
            .iter()
            .flat_map(|section| {
                section.entries.iter().map(|sub| Entry {
                    category: section.title.clone(),
                    label: sub.label.clone(),
                    description: sub.description.clone(),
                })
            })
            .collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Plain-text rendering for terminal preview.
    #[must_use]
    pub fn preview(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        out.push_str(&format!(
            "Sector: {} | Generated on: {}\n",
            self.sector_name,
            self.generated_at.format("%Y-%m-%d")
        ));
        if self.sections.is_empty() {
            out.push_str("\nNo categories selected.\n");
        }
        for section in &self.sections {
            out.push('\n');
            out.push_str(&section.title);
            out.push('\n');
            for entry in &section.entries {
                out.push_str(&format!("  - {}: {}\n", entry.label, entry.description));
            }
        }
        out
    }
}

/// Title used when a composition has none: `Tender YYYY-MM-DD`.
#[must_use]
pub fn default_title(at: DateTime<Utc>) -> String {
    format!("Tender {}", at.format("%Y-%m-%d"))
}

/// Resolve a composition in display order.
///
/// Unresolvable categories and sub-criteria are dropped with a warning.
/// A category whose every reference is dropped still contributes its
/// heading.
pub fn resolve<C: CatalogProvider + ?Sized>(
    composition: &Composition,
    catalog: &C,
    generated_at: DateTime<Utc>,
) -> TenderDocument {
    let sector = composition.sector();
    let mut sections = Vec::with_capacity(composition.category_count());

    for id in composition.category_order() {
        let Some(category) = catalog.lookup(sector, id) else {
            log_miss(&TenderError::CatalogMismatch(sector.clone(), id.clone(), None));
            continue;
        };

        let mut entries = Vec::new();
        for index in composition.subcriteria_order(id) {
            match category.subcriterion(*index) {
                Some(sub) => entries.push(sub.clone()),
                None => log_miss(&TenderError::CatalogMismatch(
                    sector.clone(),
                    id.clone(),
                    Some(*index),
                )),
            }
        }

        sections.push(Section {
            id: id.clone(),
            title: category.title.clone(),
            entries,
        });
    }

    let title = if composition.title().is_empty() {
        default_title(generated_at)
    } else {
        composition.title().to_string()
    };

    TenderDocument {
        title,
        sector: sector.clone(),
        sector_name: catalog.sector_name(sector),
        generated_at,
        sections,
    }
}

fn log_miss(error: &TenderError) {
    tracing::warn!("Skipping unresolved reference: {}", error);
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Catalog, ReorderEngine, SubIndex};
    use chrono::TimeZone;

    const CATALOG: &str = r#"
        [[categories]]
        id = "C1"
        title = "C1. Technical"
        subcriteria = [
            { label = "C1.1", description = "first" },
            { label = "C1.2", description = "second" },
        ]

        [[categories]]
        id = "C2"
        title = "C2. Financial"
        subcriteria = [{ label = "C2.1", description = "price" }]
    "#;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0)
            .single()
            .expect("valid date")
    }

    fn toggle(composition: &mut Composition, id: &str, index: usize) {
        ReorderEngine::toggle_subcriterion(composition, &CategoryId::new(id), SubIndex(index))
            .expect("toggle");
    }

    #[test]
    fn resolves_in_display_order() {
        let catalog = Catalog::from_toml_str(CATALOG).expect("catalog");
        let mut composition = Composition::new(SectorId::new("general"));
        toggle(&mut composition, "C2", 0);
        toggle(&mut composition, "C1", 1);
        toggle(&mut composition, "C1", 0);

        let doc = resolve(&composition, &catalog, at());
        assert_eq!(
            doc.entries(),
            vec![
                Entry::new("C2. Financial", "C2.1", "price"),
                Entry::new("C1. Technical", "C1.2", "second"),
                Entry::new("C1. Technical", "C1.1", "first"),
            ]
        );
        assert_eq!(doc.title, "Tender 2025-03-14");
    }

    #[test]
    fn skips_unknown_category_and_index() {
        let catalog = Catalog::from_toml_str(CATALOG).expect("catalog");
        let mut composition = Composition::new(SectorId::new("general"));
        toggle(&mut composition, "C9", 0);
        toggle(&mut composition, "C1", 5);
        toggle(&mut composition, "C1", 0);

        let doc = resolve(&composition, &catalog, at());
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].id.as_str(), "C1");
        assert_eq!(doc.entries(), vec![Entry::new("C1. Technical", "C1.1", "first")]);
    }

    #[test]
    fn heading_kept_when_every_reference_drifted() {
        let catalog = Catalog::from_toml_str(CATALOG).expect("catalog");
        let mut composition = Composition::new(SectorId::new("general"));
        toggle(&mut composition, "C2", 4);

        let doc = resolve(&composition, &catalog, at());
        assert_eq!(doc.sections.len(), 1);
        assert!(doc.sections[0].entries.is_empty());
        assert!(doc.entries().is_empty());
    }

    #[test]
    fn empty_composition_gives_empty_document() {
        let catalog = Catalog::from_toml_str(CATALOG).expect("catalog");
        let mut composition = Composition::new(SectorId::new("general"));
        composition.set_title("Bridge maintenance");

        let doc = resolve(&composition, &catalog, at());
        assert!(doc.is_empty());
        assert_eq!(doc.title, "Bridge maintenance");
        assert!(doc.preview().contains("No categories selected."));
    }

    #[test]
    fn preview_lists_entries() {
        let catalog = Catalog::from_toml_str(CATALOG).expect("catalog");
        let mut composition = Composition::new(SectorId::new("general"));
        toggle(&mut composition, "C1", 0);

        let preview = resolve(&composition, &catalog, at()).preview();
        assert!(preview.contains("Generated on: 2025-03-14"));
        assert!(preview.contains("C1. Technical\n  - C1.1: first"));
    }
}
