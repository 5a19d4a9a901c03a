//! # Criteria Catalog
//!
//! Read-only reference data: categories and their ordered sub-criteria,
//! partitioned by sector.
//!
//! Lookup order for `(sector, category)`:
//! 1. the sector's own categories
//! 2. the global partition (`default_sector`)
//!
//! Unknown sectors resolve against the global partition only. Indexes are
//! built once at load time, so lookups never scan.

use crate::primitives::{DEFAULT_SECTOR, MAX_CATALOG_SIZE};
use crate::{CategoryId, SectorId, SubIndex, TenderError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// The catalog shipped with tenderkit.
const BUILTIN_CATALOG: &str = include_str!("../data/catalog.toml");

// =============================================================================
// CATALOG ENTRIES
// =============================================================================

/// One selectable criterion inside a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subcriterion {
    pub label: String,
    pub description: String,
}

/// A catalog category with its ordered sub-criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    #[serde(default)]
    pub subcriteria: Vec<Subcriterion>,
}

impl Category {
    /// Resolve a positional reference. `None` when the index is past the
    /// current end of the list.
    #[must_use]
    pub fn subcriterion(&self, index: SubIndex) -> Option<&Subcriterion> {
        self.subcriteria.get(index.value())
    }
}

/// A catalog partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub name: String,
    /// Preferred category order for compositions in this sector.
    #[serde(default)]
    pub priority: Vec<CategoryId>,
    /// Categories that exist only in this sector.
    #[serde(default)]
    pub categories: Vec<Category>,
}

// =============================================================================
// PROVIDER TRAIT
// =============================================================================

/// Read access to catalog data.
///
/// Implementations must be deterministic and side-effect free for a given
/// `(sector, category)` pair.
pub trait CatalogProvider {
    /// Find a category as seen from `sector`.
    fn lookup(&self, sector: &SectorId, id: &CategoryId) -> Option<&Category>;

    /// Find sector metadata.
    fn sector(&self, id: &SectorId) -> Option<&Sector>;

    /// Display name for a sector, falling back to its id.
    fn sector_name(&self, id: &SectorId) -> String {
        self.sector(id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| id.as_str().to_string())
    }
}

// =============================================================================
// CATALOG
// =============================================================================

/// On-disk TOML shape.
#[derive(Debug, Deserialize)]
struct CatalogFile {
    default_sector: Option<SectorId>,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    sectors: Vec<Sector>,
}

/// The loaded, indexed catalog.
#[derive(Debug, Clone)]
pub struct Catalog {
    default_sector: SectorId,
    global: Vec<Category>,
    sectors: Vec<Sector>,
    global_index: BTreeMap<CategoryId, usize>,
    /// sector -> (position in `sectors`, category -> position in that sector)
    sector_index: BTreeMap<SectorId, (usize, BTreeMap<CategoryId, usize>)>,
}

impl Catalog {
    /// Load the built-in catalog.
    pub fn builtin() -> Result<Self, TenderError> {
        Self::from_toml_str(BUILTIN_CATALOG)
    }

    /// Parse and validate a TOML catalog.
    pub fn from_toml_str(source: &str) -> Result<Self, TenderError> {
        let file: CatalogFile = toml::from_str(source)
            .map_err(|e| TenderError::ConfigError(format!("Catalog: {}", e)))?;
        Self::from_parts(
            file.default_sector
                .unwrap_or_else(|| SectorId::new(DEFAULT_SECTOR)),
            file.categories,
            file.sectors,
        )
    }

    /// Read a TOML catalog from disk.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, TenderError> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)
            .map_err(|e| TenderError::IoError(format!("Catalog {}: {}", path.display(), e)))?;
        if metadata.len() > MAX_CATALOG_SIZE as u64 {
            return Err(TenderError::ConfigError(format!(
                "Catalog size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CATALOG_SIZE
            )));
        }
        let source = std::fs::read_to_string(path)
            .map_err(|e| TenderError::IoError(format!("Catalog {}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Build a catalog from already-parsed parts, validating ids.
    pub fn from_parts(
        default_sector: SectorId,
        global: Vec<Category>,
        sectors: Vec<Sector>,
    ) -> Result<Self, TenderError> {
        let global_index = index_categories(&global, default_sector.as_str())?;

        let mut sector_index = BTreeMap::new();
        for (position, sector) in sectors.iter().enumerate() {
            if sector.id == default_sector {
                return Err(TenderError::ConfigError(format!(
                    "Sector '{}' collides with the default partition",
                    sector.id
                )));
            }
            let categories = index_categories(&sector.categories, sector.id.as_str())?;
            if sector_index
                .insert(sector.id.clone(), (position, categories))
                .is_some()
            {
                return Err(TenderError::ConfigError(format!(
                    "Duplicate sector '{}'",
                    sector.id
                )));
            }
        }

        let catalog = Self {
            default_sector,
            global,
            sectors,
            global_index,
            sector_index,
        };

        for sector in &catalog.sectors {
            for id in &sector.priority {
                if catalog.lookup(&sector.id, id).is_none() {
                    return Err(TenderError::ConfigError(format!(
                        "Sector '{}' prioritises unknown category '{}'",
                        sector.id, id
                    )));
                }
            }
        }

        Ok(catalog)
    }

    /// The global partition id.
    #[must_use]
    pub fn default_sector(&self) -> &SectorId {
        &self.default_sector
    }

    /// All sectors in declaration order.
    pub fn sectors(&self) -> impl Iterator<Item = &Sector> {
        self.sectors.iter()
    }

    /// True when `id` is the global partition or a declared sector.
    #[must_use]
    pub fn has_sector(&self, id: &SectorId) -> bool {
        *id == self.default_sector || self.sector_index.contains_key(id)
    }

    /// The categories a picker shows for `sector`: sector-specific ones,
    /// then unshadowed global ones, ordered by the sector's priority list
    /// when it has one. Unlisted categories keep their relative order.
    #[must_use]
    pub fn categories_for(&self, sector: &SectorId) -> Vec<&Category> {
        let own: &[Category] = self
            .sector_index
            .get(sector)
            .and_then(|(position, _)| self.sectors.get(*position))
            .map(|s| s.categories.as_slice())
            .unwrap_or_default();

        let mut listed: Vec<&Category> = own.iter().collect();
        for category in &self.global {
            if !own.iter().any(|c| c.id == category.id) {
                listed.push(category);
            }
        }

        if let Some(priority) = self.sector(sector).map(|s| &s.priority) {
            listed.sort_by_key(|c| {
                priority
                    .iter()
                    .position(|p| *p == c.id)
                    .unwrap_or(priority.len())
            });
        }
        listed
    }

    /// Resolve one sub-criterion reference or report the mismatch.
    pub fn resolve(
        &self,
        sector: &SectorId,
        category: &CategoryId,
        index: SubIndex,
    ) -> Result<&Subcriterion, TenderError> {
        let found = self.lookup(sector, category).ok_or_else(|| {
            TenderError::CatalogMismatch(sector.clone(), category.clone(), None)
        })?;
        found.subcriterion(index).ok_or_else(|| {
            TenderError::CatalogMismatch(sector.clone(), category.clone(), Some(index))
        })
    }
}

impl CatalogProvider for Catalog {
    fn lookup(&self, sector: &SectorId, id: &CategoryId) -> Option<&Category> {
        let own = self.sector_index.get(sector).and_then(|(position, index)| {
            let idx = index.get(id)?;
            self.sectors.get(*position)?.categories.get(*idx)
        });
        own.or_else(|| {
            self.global_index
                .get(id)
                .and_then(|idx| self.global.get(*idx))
        })
    }

    fn sector(&self, id: &SectorId) -> Option<&Sector> {
        self.sector_index
            .get(id)
            .and_then(|(position, _)| self.sectors.get(*position))
    }
}

/// Index a category list by id, rejecting duplicates and empty categories.
fn index_categories(
    categories: &[Category],
    partition: &str,
) -> Result<BTreeMap<CategoryId, usize>, TenderError> {
    let mut index = BTreeMap::new();
    for (position, category) in categories.iter().enumerate() {
        if category.subcriteria.is_empty() {
            return Err(TenderError::ConfigError(format!(
                "Category '{}' in '{}' has no sub-criteria",
                category.id, partition
            )));
        }
        if index.insert(category.id.clone(), position).is_some() {
            return Err(TenderError::ConfigError(format!(
                "Duplicate category '{}' in '{}'",
                category.id, partition
            )));
        }
    }
    Ok(index)
}

// =============================================================================
// TESTS
// =============================================================================
