//! # Snapshot Persistence Format
//!
//! Format: Header (5 bytes) + postcard-serialized [`Snapshot`].
//! - 4 bytes: Magic ("TNDR")
//! - 1 byte: Version
//!
//! Size and header are checked before the payload is parsed.

use crate::storage::Snapshot;
use crate::{TenderError, primitives};

/// Maximum accepted size of one stored snapshot.
pub const MAX_SNAPSHOT_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

const HEADER_SIZE: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The header preceding every stored snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    pub fn validate(&self) -> Result<(), TenderError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(TenderError::SerializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(TenderError::SerializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TenderError> {
        let Some(header) = bytes.get(..HEADER_SIZE) else {
            return Err(TenderError::SerializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&header[..4]);
        Ok(Self {
            magic,
            version: header[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Serialize a snapshot (header + payload). No I/O.
pub fn snapshot_to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, TenderError> {
    let payload = postcard::to_stdvec(snapshot)
        .map_err(|e| TenderError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_SIZE + payload.len());
    result.extend_from_slice(&PersistenceHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Deserialize a snapshot. No I/O.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<Snapshot, TenderError> {
    if bytes.len() > MAX_SNAPSHOT_PAYLOAD_SIZE {
        return Err(TenderError::SerializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_SNAPSHOT_PAYLOAD_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_SIZE..]).map_err(|e| {
        TenderError::SerializationError(format!("Failed to deserialize snapshot: {}", e))
    })
}

// =============================================================================
// TESTS
// =============================================================================
