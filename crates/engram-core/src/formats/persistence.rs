//! # Snapshot File Format
//!
//! Binary serialization for Engram snapshots.
//!
//! Format: Header (5 bytes) + postcard-serialized `SnapshotData`.
//! - 4 bytes: Magic ("ENGR")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded, and the
//! decoded data must form a valid snapshot (no dangling edges).

use crate::graph::{GraphSnapshot, SnapshotData};
use crate::{EngramError, primitives};

/// Maximum allowed payload size (500 MB), checked before decoding.
pub const MAX_PERSISTENCE_PAYLOAD_SIZE: usize = 500 * 1024 * 1024;

/// Header length in bytes.
const HEADER_LEN: usize = 5;

// =============================================================================
// FILE HEADER
// =============================================================================

/// The persistence header precedes all snapshot data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl PersistenceHeader {
    /// Create a new header with current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), EngramError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(EngramError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(EngramError::DeserializationError(format!(
                "Unsupported version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Write header to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Read header from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EngramError> {
        if bytes.len() < HEADER_LEN {
            return Err(EngramError::DeserializationError(
                "Header too short".to_string(),
            ));
        }
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[0..4]);
        Ok(Self {
            magic,
            version: bytes[4],
        })
    }
}

impl Default for PersistenceHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// SERIALIZATION FUNCTIONS
// =============================================================================

/// Serialize a snapshot to bytes (header + payload).
pub fn snapshot_to_bytes(snapshot: &GraphSnapshot) -> Result<Vec<u8>, EngramError> {
    let data = SnapshotData::from(snapshot);
    let payload =
        postcard::to_stdvec(&data).map_err(|e| EngramError::SerializationError(e.to_string()))?;

    let mut result = Vec::with_capacity(HEADER_LEN + payload.len());
    result.extend_from_slice(&PersistenceHeader::new().to_bytes());
    result.extend_from_slice(&payload);
    Ok(result)
}

/// Decode the raw data of a snapshot file without building the snapshot.
pub fn snapshot_data_from_bytes(bytes: &[u8]) -> Result<SnapshotData, EngramError> {
    if bytes.len() > MAX_PERSISTENCE_PAYLOAD_SIZE {
        return Err(EngramError::DeserializationError(format!(
            "Data size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            MAX_PERSISTENCE_PAYLOAD_SIZE
        )));
    }

    let header = PersistenceHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        EngramError::DeserializationError(format!("Failed to decode snapshot data: {}", e))
    })
}

/// Deserialize and validate a snapshot from bytes.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<GraphSnapshot, EngramError> {
    GraphSnapshot::try_from(snapshot_data_from_bytes(bytes)?)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Edge, Node, NodeType, RelationType};
    use chrono::{DateTime, Utc};

    fn sample() -> GraphSnapshot {
        let at = DateTime::<Utc>::UNIX_EPOCH;
        GraphSnapshot::build(
            vec![
                Node::new("a", NodeType::Concept, "Hashing", at),
                Node::new("b", NodeType::Algorithm, "Bloom filter", at).with_difficulty(0.7),
            ],
            vec![Edge::new("e", "b", "a", RelationType::DependsOn, at)],
        )
        .expect("build")
    }

    #[test]
    fn header_roundtrip() {
        let header = PersistenceHeader::new();
        let restored = PersistenceHeader::from_bytes(&header.to_bytes()).expect("parse header");
        assert_eq!(restored, header);
    }

    #[test]
    fn bytes_roundtrip_bit_exact() {
        let bytes1 = snapshot_to_bytes(&sample()).expect("first serialize");
        let restored = snapshot_from_bytes(&bytes1).expect("deserialize");
        let bytes2 = snapshot_to_bytes(&restored).expect("second serialize");

        assert_eq!(
            bytes1, bytes2,
            "save -> load -> save must produce identical bytes"
        );
    }

    #[test]
    fn invalid_magic_rejected() {
        let mut bytes = vec![0u8; 10];
        bytes[0..4].copy_from_slice(b"KREM");
        assert!(snapshot_from_bytes(&bytes).is_err());
    }

    #[test]
    fn truncated_header_rejected() {
        assert!(matches!(
            snapshot_from_bytes(b"EN"),
            Err(EngramError::DeserializationError(_))
        ));
    }

    #[test]
    fn future_version_rejected() {
        let mut bytes = snapshot_to_bytes(&sample()).expect("serialize");
        bytes[4] = primitives::FORMAT_VERSION + 1;
        assert!(snapshot_from_bytes(&bytes).is_err());
    }
}
