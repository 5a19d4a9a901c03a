//! # Export Renderer
//!
//! Every format is fed from the same [`TenderDocument`], produced by one
//! call to [`traversal::resolve`](crate::traversal::resolve). Encoders never
//! see the composition or the catalog.
//!
//! ```text
//! Composition + Catalog ──resolve──▶ TenderDocument ──encode──▶ bytes
//!                                                   ◀─decode──
//!                                    Vec<Entry>  (category, label, description)
//! ```
//!
//! Each codec can also decode its own output back to the entry sequence.
//! [`verify_consistency`] uses that to check that all four formats carry
//! identical content in identical order.

mod canonical;
mod odf;
mod pdf;
mod sheet;
mod word;

pub use canonical::{CanonicalCodec, CanonicalTender, import_canonical};
pub use pdf::PdfCodec;
pub use sheet::SheetCodec;
pub use word::WordCodec;

use crate::catalog::CatalogProvider;
use crate::primitives::{EXPORT_BASENAME, MAX_DECODE_SIZE};
use crate::traversal::{self, Entry, TenderDocument};
use crate::{Composition, TenderError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// FORMATS
// =============================================================================

/// The four export encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Print format.
    Pdf,
    /// Word-processor format (OpenDocument Flat Text).
    Word,
    /// Spreadsheet format (OpenDocument Flat Spreadsheet).
    Spreadsheet,
    /// Canonical machine-readable format.
    Json,
}

impl ExportFormat {
    /// All formats, canonical first.
    pub const ALL: [ExportFormat; 4] = [Self::Json, Self::Pdf, Self::Word, Self::Spreadsheet];

    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "fodt",
            Self::Spreadsheet => "fods",
            Self::Json => "json",
        }
    }

    #[must_use]
    pub const fn media_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Word => "application/vnd.oasis.opendocument.text-flat-xml",
            Self::Spreadsheet => "application/vnd.oasis.opendocument.spreadsheet-flat-xml",
            Self::Json => "application/json",
        }
    }

    /// Suggested file name. Depends on the format only.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{}.{}", EXPORT_BASENAME, self.extension())
    }

    /// The codec for this format.
    #[must_use]
    pub fn codec(self) -> &'static dyn DocumentCodec {
        match self {
            Self::Pdf => &PdfCodec,
            Self::Word => &WordCodec,
            Self::Spreadsheet => &SheetCodec,
            Self::Json => &CanonicalCodec,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pdf => "pdf",
            Self::Word => "word",
            Self::Spreadsheet => "spreadsheet",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = TenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "word" | "odt" | "fodt" => Ok(Self::Word),
            "spreadsheet" | "sheet" | "ods" | "fods" => Ok(Self::Spreadsheet),
            "json" | "canonical" => Ok(Self::Json),
            other => Err(TenderError::InvalidOperation(format!(
                "unknown export format '{}' (expected pdf, word, spreadsheet or json)",
                other
            ))),
        }
    }
}

// =============================================================================
// CODEC TRAIT
// =============================================================================

/// A format-specific encoder over the resolved document.
///
/// `decode_entries` must return exactly the entries `encode` was given,
/// in order, for any text the format can represent.
pub trait DocumentCodec: Sync {
    fn format(&self) -> ExportFormat;

    /// Encode a resolved document.
    fn encode(&self, document: &TenderDocument) -> Result<Vec<u8>, TenderError>;

    /// Recover the ordered entry triples from encoded bytes.
    fn decode_entries(&self, bytes: &[u8]) -> Result<Vec<Entry>, TenderError>;

    /// Characters of `document` this format cannot carry, sorted and
    /// deduplicated. Empty for lossless formats.
    fn unrepresentable(&self, _document: &TenderDocument) -> Vec<char> {
        Vec::new()
    }
}

/// Decode with the input size checked first.
pub fn decode_entries(format: ExportFormat, bytes: &[u8]) -> Result<Vec<Entry>, TenderError> {
    if bytes.len() > MAX_DECODE_SIZE {
        return Err(TenderError::SerializationError(format!(
            "Input size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_DECODE_SIZE
        )));
    }
    format.codec().decode_entries(bytes)
}

// =============================================================================
// ARTIFACT
// =============================================================================

/// A rendered export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    /// Characters replaced by `?` in `bytes`.
    pub substituted: Vec<char>,
}

impl ExportArtifact {
    #[must_use]
    pub fn file_name(&self) -> String {
        self.format.file_name()
    }

    #[must_use]
    pub fn media_type(&self) -> &'static str {
        self.format.media_type()
    }

    /// Whether the bytes carry the document text exactly.
    #[must_use]
    pub fn is_lossless(&self) -> bool {
        self.substituted.is_empty()
    }

    /// BLAKE3 hex digest of the artifact bytes.
    #[cfg(feature = "crypto-hash")]
    #[must_use]
    pub fn digest(&self) -> String {
        blake3::hash(&self.bytes).to_hex().to_string()
    }
}

// =============================================================================
// RENDERER
// =============================================================================

/// Renders compositions against one catalog.
pub struct Renderer<'a, C: CatalogProvider + ?Sized> {
    catalog: &'a C,
}

impl<'a, C: CatalogProvider + ?Sized> Renderer<'a, C> {
    #[must_use]
    pub fn new(catalog: &'a C) -> Self {
        Self { catalog }
    }

    /// Resolve without encoding.
    #[must_use]
    pub fn document(&self, composition: &Composition, generated_at: DateTime<Utc>) -> TenderDocument {
        traversal::resolve(composition, self.catalog, generated_at)
    }

    /// Render with the current time as the generation timestamp.
    pub fn render(
        &self,
        composition: &Composition,
        format: ExportFormat,
    ) -> Result<ExportArtifact, TenderError> {
        self.render_at(composition, format, Utc::now())
    }

    /// Render with a fixed generation timestamp. Output is deterministic.
    pub fn render_at(
        &self,
        composition: &Composition,
        format: ExportFormat,
        generated_at: DateTime<Utc>,
    ) -> Result<ExportArtifact, TenderError> {
        let document = self.document(composition, generated_at);
        encode(&document, format)
    }
}

/// Encode an already resolved document.
pub fn encode(document: &TenderDocument, format: ExportFormat) -> Result<ExportArtifact, TenderError> {
    let codec = format.codec();
    let bytes = codec.encode(document)?;
    let substituted = codec.unrepresentable(document);
    if !substituted.is_empty() {
        tracing::warn!(
            format = %format,
            characters = %substituted.iter().collect::<String>(),
            "Export replaced unrepresentable characters with '?'"
        );
    }
    tracing::debug!(
        format = %format,
        sections = document.sections.len(),
        bytes = bytes.len(),
        "Rendered export"
    );
    Ok(ExportArtifact {
        format,
        bytes,
        substituted,
    })
}

// =============================================================================
// CONSISTENCY
// =============================================================================

/// Outcome of checking one format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatCheck {
    pub format: ExportFormat,
    pub decoded_entries: usize,
    pub consistent: bool,
    /// Why the check failed, if it did.
    pub detail: Option<String>,
}

/// Result of [`verify_consistency`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub expected_entries: usize,
    pub checks: Vec<FormatCheck>,
}

impl ConsistencyReport {
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.checks.iter().all(|c| c.consistent)
    }
}

/// Encode the document in every format, decode each back and compare the
/// entry sequences with the document's own.
#[must_use]
pub fn verify_consistency(document: &TenderDocument) -> ConsistencyReport {
    let expected = document.entries();
    let checks = ExportFormat::ALL
        .iter()
        .map(|format| check_format(document, &expected, *format))
        .collect();
    ConsistencyReport {
        expected_entries: expected.len(),
        checks,
    }
}

fn check_format(document: &TenderDocument, expected: &[Entry], format: ExportFormat) -> FormatCheck {
    let decoded = encode(document, format).and_then(|artifact| {
        let entries = decode_entries(format, &artifact.bytes)?;
        Ok((artifact.substituted, entries))
    });
    match decoded {
        Ok((substituted, entries)) => {
            let mismatch = first_mismatch(expected, &entries);
            let detail = match (mismatch, substituted.is_empty()) {
                (Some(mismatch), false) => Some(format!(
                    "Cannot represent {:?}: {}",
                    substituted.iter().collect::<String>(),
                    mismatch
                )),
                (mismatch, _) => mismatch,
            };
            FormatCheck {
                format,
                decoded_entries: entries.len(),
                consistent: detail.is_none(),
                detail,
            }
        }
        Err(e) => FormatCheck {
            format,
            decoded_entries: 0,
            consistent: false,
            detail: Some(e.to_string()),
        },
    }
}

fn first_mismatch(expected: &[Entry], actual: &[Entry]) -> Option<String> {
    if let Some(position) = expected.iter().zip(actual).position(|(a, b)| a != b) {
        return Some(format!("entry {} differs", position));
    }
    if expected.len() != actual.len() {
        return Some(format!(
            "expected {} entries, decoded {}",
            expected.len(),
            actual.len()
        ));
    }
    None
}

// =============================================================================
// TESTS
// =============================================================================
