//! # Primitives
//!
//! Hardcoded constants for tenderkit.
//!
//! These are compiled into the binary and are immutable at runtime.

/// The catalog partition every lookup falls back to.
pub const DEFAULT_SECTOR: &str = "general";

/// Magic bytes for the snapshot persistence header.
pub const MAGIC_BYTES: &[u8; 4] = b"TNDR";

/// Current snapshot serialization format version.
///
/// Increment this when making breaking changes to the serialization format.
pub const FORMAT_VERSION: u8 = 1;

/// Base name shared by every exported artifact.
pub const EXPORT_BASENAME: &str = "tender_criteria";

/// Heading written at the top of print and word-processor exports.
pub const DOCUMENT_HEADING: &str = "Tender Document";

/// Column header row of the spreadsheet export.
pub const SPREADSHEET_HEADER: [&str; 3] = ["Category", "Subcriteria", "Description"];

/// Name of the single sheet in the spreadsheet export.
pub const SHEET_NAME: &str = "Tender";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum size of a catalog file.
pub const MAX_CATALOG_SIZE: usize = 4 * 1024 * 1024;

/// Maximum size of any document handed to a decoder.
///
/// This prevents memory exhaustion from malicious or malformed input.
pub const MAX_DECODE_SIZE: usize = 64 * 1024 * 1024;

/// Maximum number of categories one composition may hold.
pub const MAX_CATEGORIES: usize = 1024;

/// Number of sectors reported by history statistics.
pub const TOP_SECTORS: usize = 5;
