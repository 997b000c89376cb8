//! # Snapshot Export
//!
//! Deterministic binary encoding of a [`GraphSnapshot`].
//!
//! Records are normalized (sorted by kind, then id) before encoding, so two
//! stores holding the same graph export identical bytes regardless of their
//! backend or insertion history.
//!
//! Format:
//! ```text
//! [header_len: u32 LE] [SnapshotHeader (postcard)] [GraphSnapshot (postcard)]
//! ```

use crate::graph::GraphSnapshot;
use crate::primitives::{
    MAX_IMPORT_EDGES, MAX_IMPORT_NODES, MAX_SNAPSHOT_BYTES, SNAPSHOT_MAGIC, SNAPSHOT_VERSION,
};
use crate::types::CostarError;
use serde::{Deserialize, Serialize};

// =============================================================================
// HEADER
// =============================================================================

/// Header for snapshot files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Magic bytes to identify the format.
    pub magic: [u8; 4],
    /// Format version for compatibility.
    pub version: u32,
    pub work_count: u64,
    pub contributor_count: u64,
    pub edge_count: u64,
    /// Checksum of the data section. Not cryptographic.
    pub checksum: u64,
}

impl SnapshotHeader {
    /// Build the header describing a normalized snapshot.
    #[must_use]
    pub fn describe(snapshot: &GraphSnapshot) -> Self {
        Self {
            magic: *SNAPSHOT_MAGIC,
            version: SNAPSHOT_VERSION,
            work_count: snapshot.works.len() as u64,
            contributor_count: snapshot.contributors.len() as u64,
            edge_count: snapshot.edges.len() as u64,
            checksum: snapshot_checksum(snapshot),
        }
    }

    /// Validate magic, version and size limits.
    ///
    /// Runs before the data section is decoded.
    pub fn validate(&self) -> Result<(), CostarError> {
        if &self.magic != SNAPSHOT_MAGIC {
            return Err(CostarError::Serialization(
                "Invalid file format".to_string(),
            ));
        }
        if self.version != SNAPSHOT_VERSION {
            return Err(CostarError::Serialization(
                "Unsupported file version".to_string(),
            ));
        }
        let nodes = self.work_count.saturating_add(self.contributor_count);
        if nodes > MAX_IMPORT_NODES as u64 {
            return Err(CostarError::Serialization(format!(
                "Node count {} exceeds maximum allowed {}",
                nodes, MAX_IMPORT_NODES
            )));
        }
        if self.edge_count > MAX_IMPORT_EDGES as u64 {
            return Err(CostarError::Serialization(format!(
                "Edge count {} exceeds maximum allowed {}",
                self.edge_count, MAX_IMPORT_EDGES
            )));
        }
        Ok(())
    }
}

// =============================================================================
// CHECKSUM
// =============================================================================

fn mix(hash: u64, text: &str, salt: u32) -> u64 {
    text.bytes()
        .fold(hash.rotate_left(salt), |acc, b| acc.rotate_left(5) ^ u64::from(b))
}

/// Order-sensitive rotate/XOR checksum over every record.
///
/// Detects accidental corruption only; it is not collision resistant.
#[must_use]
pub fn snapshot_checksum(snapshot: &GraphSnapshot) -> u64 {
    let mut hash: u64 = 0;
    for work in &snapshot.works {
        hash = mix(hash, &work.id, 13);
        hash = mix(hash, &work.title, 7);
        hash = mix(hash, work.poster_path.as_deref().unwrap_or(""), 3);
        hash = mix(hash, work.release_date.as_deref().unwrap_or(""), 3);
    }
    for person in &snapshot.contributors {
        hash = mix(hash, &person.id, 17);
        hash = mix(hash, &person.name, 11);
        hash = mix(hash, person.profile_path.as_deref().unwrap_or(""), 3);
    }
    for edge in &snapshot.edges {
        hash = mix(hash, &edge.contributor_id, 19);
        hash = mix(hash, &edge.work_id, 23);
    }
    hash
}

// =============================================================================
// EXPORT / IMPORT
// =============================================================================

/// Encode a snapshot in the binary format.
pub fn export_snapshot(snapshot: &GraphSnapshot) -> Result<Vec<u8>, CostarError> {
    let mut snapshot = snapshot.clone();
    snapshot.normalize();
    let header = SnapshotHeader::describe(&snapshot);

    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| CostarError::Serialization(format!("Header: {}", e)))?;
    let data_bytes = postcard::to_allocvec(&snapshot)
        .map_err(|e| CostarError::Serialization(format!("Data: {}", e)))?;

    let mut result = Vec::with_capacity(4 + header_bytes.len() + data_bytes.len());
    result.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    result.extend_from_slice(&header_bytes);
    result.extend_from_slice(&data_bytes);
    Ok(result)
}

/// Decode and verify a binary snapshot.
pub fn import_snapshot(data: &[u8]) -> Result<GraphSnapshot, CostarError> {
    if data.len() > MAX_SNAPSHOT_BYTES {
        return Err(CostarError::Serialization(format!(
            "Snapshot of {} bytes exceeds maximum allowed {}",
            data.len(),
            MAX_SNAPSHOT_BYTES
        )));
    }
    let (len_bytes, rest) = data
        .split_first_chunk::<4>()
        .ok_or_else(|| CostarError::Serialization("Data too short".to_string()))?;
    let header_len = u32::from_le_bytes(*len_bytes) as usize;
    if rest.len() < header_len {
        return Err(CostarError::Serialization(
            "Data too short for header".to_string(),
        ));
    }
    let (header_bytes, body) = rest.split_at(header_len);

    let header: SnapshotHeader = postcard::from_bytes(header_bytes)
        .map_err(|e| CostarError::Serialization(format!("Header: {}", e)))?;
    header.validate()?;

    let snapshot: GraphSnapshot = postcard::from_bytes(body)
        .map_err(|e| CostarError::Serialization(format!("Data: {}", e)))?;

    let computed = snapshot_checksum(&snapshot);
    if computed != header.checksum {
        return Err(CostarError::Serialization(format!(
            "Checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }
    if snapshot.works.len() as u64 != header.work_count
        || snapshot.contributors.len() as u64 != header.contributor_count
        || snapshot.edges.len() as u64 != header.edge_count
    {
        return Err(CostarError::Serialization(
            "Record count mismatch".to_string(),
        ));
    }
    Ok(snapshot)
}

/// Render a snapshot as pretty JSON (normalized order).
pub fn export_snapshot_json(snapshot: &GraphSnapshot) -> Result<String, CostarError> {
    let mut snapshot = snapshot.clone();
    snapshot.normalize();
    serde_json::to_string_pretty(&snapshot).map_err(|e| CostarError::Serialization(e.to_string()))
}

/// Parse a JSON snapshot.
pub fn import_snapshot_json(data: &[u8]) -> Result<GraphSnapshot, CostarError> {
    serde_json::from_slice(data).map_err(|e| CostarError::Serialization(e.to_string()))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, GraphStore};
    use crate::types::{ContributorAttrs, WorkAttrs};

    fn create_test_snapshot() -> GraphSnapshot {
        let mut graph = Graph::new();
        graph
            .upsert_work("603", WorkAttrs::new().title("The Matrix"))
            .expect("work");
        graph
            .upsert_work("13", WorkAttrs::new().title("Forrest Gump"))
            .expect("work");
        graph
            .upsert_contributor("6384", ContributorAttrs::new().name("Keanu Reeves"))
            .expect("contributor");
        graph
            .upsert_contributor("31", ContributorAttrs::new().name("Tom Hanks"))
            .expect("contributor");
        graph.ensure_edge("6384", "603").expect("edge");
        graph.ensure_edge("31", "13").expect("edge");
        graph.snapshot().expect("snapshot")
    }

    #[test]
    fn snapshot_roundtrip() {
        let snapshot = create_test_snapshot();
        let bytes = export_snapshot(&snapshot).expect("export");
        let restored = import_snapshot(&bytes).expect("import");
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn export_is_order_independent() {
        let snapshot = create_test_snapshot();
        let mut shuffled = snapshot.clone();
        shuffled.works.reverse();
        shuffled.edges.reverse();

        assert_eq!(
            export_snapshot(&snapshot).expect("export"),
            export_snapshot(&shuffled).expect("export")
        );
    }

    #[test]
    fn checksum_sees_label_changes() {
        let snapshot = create_test_snapshot();
        let mut renamed = snapshot.clone();
        if let Some(work) = renamed.works.first_mut() {
            work.title.push('!');
        }
        assert_ne!(snapshot_checksum(&snapshot), snapshot_checksum(&renamed));
    }

    #[test]
    fn empty_snapshot_export() {
        let bytes = export_snapshot(&GraphSnapshot::default()).expect("export");
        let restored = import_snapshot(&bytes).expect("import");
        assert_eq!(restored.counts().works, 0);
    }

    #[test]
    fn corrupted_import_empty_data() {
        assert!(import_snapshot(&[]).is_err());
        assert!(import_snapshot(&[1, 2]).is_err());
    }

    #[test]
    fn corrupted_import_header_length_exceeds_data() {
        let data = [255u8, 0, 0, 0, 1, 2, 3];
        assert!(import_snapshot(&data).is_err());
    }

    #[test]
    fn corrupted_import_invalid_magic_bytes() {
        let snapshot = create_test_snapshot();
        let mut header = SnapshotHeader::describe(&snapshot);
        header.magic = *b"NOPE";
        assert!(header.validate().is_err());
    }

    #[test]
    fn corrupted_import_excessive_edge_count() {
        let mut header = SnapshotHeader::describe(&GraphSnapshot::default());
        header.edge_count = MAX_IMPORT_EDGES as u64 + 1;
        let err = header.validate().expect_err("limit");
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn corrupted_import_garbage_data_section() {
        let mut bytes = export_snapshot(&create_test_snapshot()).expect("export");
        let len = bytes.len();
        if let Some(last) = bytes.get_mut(len - 3) {
            *last ^= 0xFF;
        }
        assert!(import_snapshot(&bytes).is_err());
    }

    #[test]
    fn json_roundtrip() {
        let snapshot = create_test_snapshot();
        let json = export_snapshot_json(&snapshot).expect("json");
        let restored = import_snapshot_json(json.as_bytes()).expect("parse");
        assert_eq!(restored, snapshot);
    }
}
