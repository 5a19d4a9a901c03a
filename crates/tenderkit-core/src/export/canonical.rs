//! Canonical JSON export.
//!
//! The machine-readable form of a tender and the reference other formats
//! are verified against:
//!
//! ```json
//! {
//!   "title": "...",
//!   "sector": "it",
//!   "generatedDate": "2025-06-02T08:00:00Z",
//!   "categories": [
//!     { "id": "C1", "title": "...", "subcriteria": [{ "label": "...", "description": "..." }] }
//!   ]
//! }
//! ```

use super::{DocumentCodec, ExportFormat};
use crate::catalog::Subcriterion;
use crate::primitives::{MAX_CATEGORIES, MAX_DECODE_SIZE};
use crate::traversal::{Entry, Section, TenderDocument};
use crate::{CategoryId, SectorId, TenderError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One category in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalCategory {
    pub id: CategoryId,
    pub title: String,
    pub subcriteria: Vec<Subcriterion>,
}

/// The canonical document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTender {
    pub title: String,
    /// Sector id, not its display name.
    pub sector: SectorId,
    pub generated_date: DateTime<Utc>,
    pub categories: Vec<CanonicalCategory>,
}

impl CanonicalTender {
    #[must_use]
    pub fn from_document(document: &TenderDocument) -> Self {
        Self {
            title: document.title.clone(),
            sector: document.sector.clone(),
            generated_date: document.generated_at,
            categories: document
                .sections
                .iter()
                .map(|section| CanonicalCategory {
                    id: section.id.clone(),
                    title: section.title.clone(),
                    subcriteria: section.entries.clone(),
                })
                .collect(),
        }
    }

    /// Convert back. The sector display name is not part of the canonical
    /// form, so the sector id stands in for it.
    #[must_use]
    pub fn into_document(self) -> TenderDocument {
        TenderDocument {
            title: self.title,
            sector_name: self.sector.as_str().to_string(),
            sector: self.sector,
            generated_at: self.generated_date,
            sections: self
                .categories
                .into_iter()
                .map(|category| Section {
                    id: category.id,
                    title: category.title,
                    entries: category.subcriteria,
                })
                .collect(),
        }
    }
}

/// Canonical JSON codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalCodec;

impl DocumentCodec for CanonicalCodec {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn encode(&self, document: &TenderDocument) -> Result<Vec<u8>, TenderError> {
        serde_json::to_vec_pretty(&CanonicalTender::from_document(document))
            .map_err(|e| TenderError::SerializationError(format!("Canonical JSON: {}", e)))
    }

    fn decode_entries(&self, bytes: &[u8]) -> Result<Vec<Entry>, TenderError> {
        import_canonical(bytes).map(|document| document.entries())
    }
}

/// Parse a canonical JSON export back into a document.
///
/// # Errors
///
/// Returns `TenderError::SerializationError` when the input is oversized,
/// is not canonical JSON, or holds more categories than a composition may.
pub fn import_canonical(bytes: &[u8]) -> Result<TenderDocument, TenderError> {
    if bytes.len() > MAX_DECODE_SIZE {
        return Err(TenderError::SerializationError(format!(
            "Input size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_DECODE_SIZE
        )));
    }

    let canonical: CanonicalTender = serde_json::from_slice(bytes)
        .map_err(|e| TenderError::SerializationError(format!("Canonical JSON: {}", e)))?;

    if canonical.categories.len() > MAX_CATEGORIES {
        return Err(TenderError::SerializationError(format!(
            "Category count {} exceeds maximum allowed {}",
            canonical.categories.len(),
            MAX_CATEGORIES
        )));
    }

    Ok(canonical.into_document())
}
