//! # redb-backed Graph Storage
//!
//! A disk-backed graph store using the redb embedded database, providing:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//!
//! Node records and adjacency sets are postcard-encoded. Every mutator runs
//! in exactly one write transaction, so an edge lands in both adjacency
//! directions and the edge counter together or not at all.

use crate::graph::{GraphSnapshot, GraphStore};
use crate::types::{
    ContributionEdge, ContributorAttrs, ContributorNode, CostarError, NodeKind, NodeRef,
    WorkAttrs, WorkNode, validate_id,
};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::path::Path;

type RecordTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Work records: work id -> postcard `WorkNode`
const WORKS: RecordTable = TableDefinition::new("works");

/// Contributor records: contributor id -> postcard `ContributorNode`
const CONTRIBUTORS: RecordTable = TableDefinition::new("contributors");

/// Adjacency: work id -> postcard `BTreeSet<contributor id>`
const CAST: RecordTable = TableDefinition::new("cast");

/// Adjacency: contributor id -> postcard `BTreeSet<work id>`
const FILMOGRAPHY: RecordTable = TableDefinition::new("filmography");

/// Table for metadata: key string -> value u64
const METADATA: TableDefinition<&str, u64> = TableDefinition::new("metadata");

const EDGE_COUNT_KEY: &str = "edge_count";

fn store_err(e: impl std::fmt::Display) -> CostarError {
    CostarError::InternalStore(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CostarError> {
    postcard::to_allocvec(value).map_err(|e| CostarError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CostarError> {
    postcard::from_bytes(bytes).map_err(|e| CostarError::Serialization(e.to_string()))
}

/// A disk-backed graph store using redb.
pub struct RedbGraph {
    db: Database,
}

impl std::fmt::Debug for RedbGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbGraph").finish_non_exhaustive()
    }
}

impl RedbGraph {
    /// Open or create a graph database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CostarError> {
        let db = Database::create(path.as_ref()).map_err(|e| CostarError::Io(e.to_string()))?;

        // Initialize tables if they don't exist
        let write_txn = db.begin_write().map_err(store_err)?;
        for table in [WORKS, CONTRIBUTORS, CAST, FILMOGRAPHY] {
            let _ = write_txn.open_table(table).map_err(store_err)?;
        }
        let _ = write_txn.open_table(METADATA).map_err(store_err)?;
        write_txn.commit().map_err(store_err)?;

        Ok(Self { db })
    }

    /// Create or patch one record inside its own write transaction.
    fn upsert_record<T, F>(&self, table: RecordTable, id: &str, merge: F) -> Result<T, CostarError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> T,
    {
        let write_txn = self.db.begin_write().map_err(store_err)?;
        let record = {
            let mut records = write_txn.open_table(table).map_err(store_err)?;
            let existing: Option<T> = match records.get(id).map_err(store_err)? {
                Some(data) => Some(decode(data.value())?),
                None => None,
            };
            let record = merge(existing);
            let bytes = encode(&record)?;
            records.insert(id, bytes.as_slice()).map_err(store_err)?;
            record
        };
        write_txn.commit().map_err(store_err)?;
        Ok(record)
    }

    fn read_record<T: DeserializeOwned>(
        &self,
        table: RecordTable,
        id: &str,
    ) -> Result<Option<T>, CostarError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let records = read_txn.open_table(table).map_err(store_err)?;
        match records.get(id).map_err(store_err)? {
            Some(data) => Ok(Some(decode(data.value())?)),
            None => Ok(None),
        }
    }

    fn table_len(&self, table: RecordTable) -> Result<usize, CostarError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let records = read_txn.open_table(table).map_err(store_err)?;
        let count = records.len().map_err(store_err)?;
        Ok(count as usize)
    }
}

impl GraphStore for RedbGraph {
    fn upsert_work(&mut self, id: &str, attrs: WorkAttrs) -> Result<WorkNode, CostarError> {
        validate_id(id)?;
        self.upsert_record(WORKS, id, |existing: Option<WorkNode>| match existing {
            Some(mut node) => {
                node.apply(attrs);
                node
            }
            None => WorkNode::create(id, attrs),
        })
    }

    fn upsert_contributor(
        &mut self,
        id: &str,
        attrs: ContributorAttrs,
    ) -> Result<ContributorNode, CostarError> {
        validate_id(id)?;
        self.upsert_record(
            CONTRIBUTORS,
            id,
            |existing: Option<ContributorNode>| match existing {
                Some(mut node) => {
                    node.apply(attrs);
                    node
                }
                None => ContributorNode::create(id, attrs),
            },
        )
    }

    fn ensure_edge(&mut self, contributor_id: &str, work_id: &str) -> Result<bool, CostarError> {
        validate_id(contributor_id)?;
        validate_id(work_id)?;

        let write_txn = self.db.begin_write().map_err(store_err)?;
        {
            let works = write_txn.open_table(WORKS).map_err(store_err)?;
            if works.get(work_id).map_err(store_err)?.is_none() {
                return Err(CostarError::Validation(format!(
                    "edge endpoint work {work_id} does not exist"
                )));
            }
            let contributors = write_txn.open_table(CONTRIBUTORS).map_err(store_err)?;
            if contributors.get(contributor_id).map_err(store_err)?.is_none() {
                return Err(CostarError::Validation(format!(
                    "edge endpoint contributor {contributor_id} does not exist"
                )));
            }
        }

        {
            let mut cast_table = write_txn.open_table(CAST).map_err(store_err)?;
            let mut cast: BTreeSet<String> = match cast_table.get(work_id).map_err(store_err)? {
                Some(data) => decode(data.value())?,
                None => BTreeSet::new(),
            };
            if !cast.insert(contributor_id.to_string()) {
                // Already linked; dropping the transaction aborts it.
                return Ok(false);
            }
            let bytes = encode(&cast)?;
            cast_table
                .insert(work_id, bytes.as_slice())
                .map_err(store_err)?;
        }
        {
            let mut film_table = write_txn.open_table(FILMOGRAPHY).map_err(store_err)?;
            let mut works: BTreeSet<String> =
                match film_table.get(contributor_id).map_err(store_err)? {
                    Some(data) => decode(data.value())?,
                    None => BTreeSet::new(),
                };
            works.insert(work_id.to_string());
            let bytes = encode(&works)?;
            film_table
                .insert(contributor_id, bytes.as_slice())
                .map_err(store_err)?;
        }
        {
            let mut meta_table = write_txn.open_table(METADATA).map_err(store_err)?;
            let current = meta_table
                .get(EDGE_COUNT_KEY)
                .map_err(store_err)?
                .map(|v| v.value())
                .unwrap_or(0);
            meta_table
                .insert(EDGE_COUNT_KEY, current.saturating_add(1))
                .map_err(store_err)?;
        }
        write_txn.commit().map_err(store_err)?;
        Ok(true)
    }

    fn get_work(&self, id: &str) -> Result<WorkNode, CostarError> {
        self.read_record(WORKS, id)?
            .ok_or_else(|| CostarError::WorkNotFound(id.to_string()))
    }

    fn get_contributor(&self, id: &str) -> Result<ContributorNode, CostarError> {
        self.read_record(CONTRIBUTORS, id)?
            .ok_or_else(|| CostarError::ContributorNotFound(id.to_string()))
    }

    fn contains(&self, node: &NodeRef) -> Result<bool, CostarError> {
        let table = match node.kind {
            NodeKind::Work => WORKS,
            NodeKind::Contributor => CONTRIBUTORS,
        };
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let records = read_txn.open_table(table).map_err(store_err)?;
        Ok(records.get(node.id.as_str()).map_err(store_err)?.is_some())
    }

    fn neighbors(&self, node: &NodeRef) -> Result<BTreeSet<String>, CostarError> {
        let table = match node.kind {
            NodeKind::Work => CAST,
            NodeKind::Contributor => FILMOGRAPHY,
        };
        Ok(self
            .read_record::<BTreeSet<String>>(table, &node.id)?
            .unwrap_or_default())
    }

    fn work_count(&self) -> Result<usize, CostarError> {
        self.table_len(WORKS)
    }

    fn contributor_count(&self) -> Result<usize, CostarError> {
        self.table_len(CONTRIBUTORS)
    }

    fn edge_count(&self) -> Result<usize, CostarError> {
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let meta_table = read_txn.open_table(METADATA).map_err(store_err)?;
        let count = meta_table
            .get(EDGE_COUNT_KEY)
            .map_err(store_err)?
            .map(|v| v.value())
            .unwrap_or(0);
        Ok(count as usize)
    }

    fn snapshot(&self) -> Result<GraphSnapshot, CostarError> {
        // One read transaction: the three record kinds come from the same version.
        let read_txn = self.db.begin_read().map_err(store_err)?;
        let mut snapshot = GraphSnapshot::default();

        let works = read_txn.open_table(WORKS).map_err(store_err)?;
        for entry in works.iter().map_err(store_err)? {
            let (_, value) = entry.map_err(store_err)?;
            snapshot.works.push(decode(value.value())?);
        }

        let contributors = read_txn.open_table(CONTRIBUTORS).map_err(store_err)?;
        for entry in contributors.iter().map_err(store_err)? {
            let (_, value) = entry.map_err(store_err)?;
            snapshot.contributors.push(decode(value.value())?);
        }

        let cast = read_txn.open_table(CAST).map_err(store_err)?;
        for entry in cast.iter().map_err(store_err)? {
            let (key, value) = entry.map_err(store_err)?;
            let work_id = key.value();
            let ids: BTreeSet<String> = decode(value.value())?;
            snapshot.edges.extend(
                ids.into_iter()
                    .map(|contributor_id| ContributionEdge::new(contributor_id, work_id)),
            );
        }

        snapshot.normalize();
        Ok(snapshot)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::types::GraphCounts;
    use tempfile::tempdir;

    fn seed(store: &mut dyn GraphStore) {
        store
            .upsert_work("603", WorkAttrs::new().title("The Matrix"))
            .expect("work");
        store
            .upsert_work("604", WorkAttrs::new().title("The Matrix Reloaded"))
            .expect("work");
        store
            .upsert_contributor("6384", ContributorAttrs::new().name("Keanu Reeves"))
            .expect("contributor");
        store
            .upsert_contributor("2975", ContributorAttrs::new().name("Laurence Fishburne"))
            .expect("contributor");
        store.ensure_edge("6384", "603").expect("edge");
        store.ensure_edge("6384", "604").expect("edge");
        store.ensure_edge("2975", "603").expect("edge");
    }

    #[test]
    fn basic_operations() {
        let temp = tempdir().expect("temp dir");
        let mut graph = RedbGraph::open(temp.path().join("test.redb")).expect("open db");
        seed(&mut graph);

        assert_eq!(
            graph.counts().expect("counts"),
            GraphCounts {
                works: 2,
                contributors: 2,
                edges: 3
            }
        );
        assert_eq!(graph.get_work("604").expect("work").title, "The Matrix Reloaded");
    }

    #[test]
    fn edge_deduplication() {
        let temp = tempdir().expect("temp dir");
        let mut graph = RedbGraph::open(temp.path().join("test.redb")).expect("open db");
        seed(&mut graph);

        assert!(!graph.ensure_edge("6384", "603").expect("edge"));
        assert_eq!(graph.edge_count().expect("count"), 3);
    }

    #[test]
    fn dangling_edge_rejected_without_write() {
        let temp = tempdir().expect("temp dir");
        let mut graph = RedbGraph::open(temp.path().join("test.redb")).expect("open db");
        graph
            .upsert_work("603", WorkAttrs::new().title("The Matrix"))
            .expect("work");

        let err = graph.ensure_edge("999", "603").expect_err("dangling");
        assert!(matches!(err, CostarError::Validation(_)));
        assert_eq!(graph.edge_count().expect("count"), 0);
        assert!(
            graph
                .neighbors(&NodeRef::work("603"))
                .expect("neighbors")
                .is_empty()
        );
    }

    #[test]
    fn upsert_overwrites_present_fields_only() {
        let temp = tempdir().expect("temp dir");
        let mut graph = RedbGraph::open(temp.path().join("test.redb")).expect("open db");
        graph
            .upsert_contributor(
                "6384",
                ContributorAttrs::new()
                    .name("Keanu")
                    .profile_path(Some("/k.jpg".to_string())),
            )
            .expect("contributor");
        let updated = graph
            .upsert_contributor("6384", ContributorAttrs::new().name("Keanu Reeves"))
            .expect("contributor");

        assert_eq!(updated.name, "Keanu Reeves");
        assert_eq!(updated.profile_path.as_deref(), Some("/k.jpg"));
    }

    #[test]
    fn recovery_persistence_after_reopen() {
        let temp = tempdir().expect("temp dir");
        let db_path = temp.path().join("test.redb");

        let before = {
            let mut graph = RedbGraph::open(&db_path).expect("open db");
            seed(&mut graph);
            graph.snapshot().expect("snapshot")
        };

        let graph = RedbGraph::open(&db_path).expect("reopen db");
        assert_eq!(graph.snapshot().expect("snapshot"), before);
        assert_eq!(
            graph
                .neighbors(&NodeRef::contributor("6384"))
                .expect("neighbors")
                .len(),
            2
        );
        assert_eq!(graph.edge_count().expect("count"), 3);
    }

    #[test]
    fn snapshot_matches_in_memory_graph() {
        let temp = tempdir().expect("temp dir");
        let mut disk = RedbGraph::open(temp.path().join("test.redb")).expect("open db");
        let mut memory = Graph::new();
        seed(&mut disk);
        seed(&mut memory);

        assert_eq!(
            disk.snapshot().expect("snapshot"),
            memory.snapshot().expect("snapshot")
        );
    }

    #[test]
    fn namespaces_are_disjoint() {
        let temp = tempdir().expect("temp dir");
        let mut graph = RedbGraph::open(temp.path().join("test.redb")).expect("open db");
        graph
            .upsert_work("7", WorkAttrs::new().title("Seven"))
            .expect("work");

        assert!(graph.contains(&NodeRef::work("7")).expect("contains"));
        assert!(!graph.contains(&NodeRef::contributor("7")).expect("contains"));
        assert!(matches!(
            graph.get_contributor("7"),
            Err(CostarError::ContributorNotFound(_))
        ));
    }
}
