//! # Store Handle
//!
//! Shared, lock-protected access to one graph store.
//!
//! ## Storage Backends
//!
//! - `InMemory`: in-memory `Graph` (fast, volatile unless explicitly saved)
//! - `Persistent`: `RedbGraph` for disk-backed ACID storage
//!
//! A `GraphHandle` is passed explicitly to every component that touches the
//! graph; clones share the same store. Each write primitive holds the write
//! lock for exactly one call, while [`GraphHandle::read`] holds the read lock
//! for the whole closure so a traversal observes one consistent state.

use crate::export::{export_snapshot, import_snapshot, import_snapshot_json};
use crate::graph::{Graph, GraphSnapshot, GraphStore};
use crate::storage::RedbGraph;
use crate::types::{
    ContributorAttrs, ContributorNode, CostarError, GraphCounts, NodeRef, WorkAttrs, WorkNode,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// =============================================================================
// BACKEND SELECTION
// =============================================================================

/// Which store a handle opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Volatile, nothing touches disk.
    Memory,
    /// In-memory graph loaded from and saved to a snapshot file.
    File,
    /// redb database, every write committed to disk.
    #[default]
    Redb,
}

impl BackendKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Redb => "redb",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = CostarError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "redb" => Ok(Self::Redb),
            other => Err(CostarError::Validation(format!(
                "unknown backend '{other}' (expected memory, file or redb)"
            ))),
        }
    }
}

// =============================================================================
// STORAGE BACKEND
// =============================================================================

/// The concrete store behind a handle.
#[derive(Debug)]
pub enum StorageBackend {
    /// In-memory graph (fast, volatile).
    InMemory(Graph),
    /// Disk-backed graph using redb (ACID, persistent).
    Persistent(RedbGraph),
}

impl Default for StorageBackend {
    fn default() -> Self {
        Self::InMemory(Graph::new())
    }
}

impl StorageBackend {
    fn store(&self) -> &dyn GraphStore {
        match self {
            Self::InMemory(graph) => graph,
            Self::Persistent(redb) => redb,
        }
    }

    fn store_mut(&mut self) -> &mut dyn GraphStore {
        match self {
            Self::InMemory(graph) => graph,
            Self::Persistent(redb) => redb,
        }
    }
}

impl GraphStore for StorageBackend {
    fn upsert_work(&mut self, id: &str, attrs: WorkAttrs) -> Result<WorkNode, CostarError> {
        self.store_mut().upsert_work(id, attrs)
    }

    fn upsert_contributor(
        &mut self,
        id: &str,
        attrs: ContributorAttrs,
    ) -> Result<ContributorNode, CostarError> {
        self.store_mut().upsert_contributor(id, attrs)
    }

    fn ensure_edge(&mut self, contributor_id: &str, work_id: &str) -> Result<bool, CostarError> {
        self.store_mut().ensure_edge(contributor_id, work_id)
    }

    fn get_work(&self, id: &str) -> Result<WorkNode, CostarError> {
        self.store().get_work(id)
    }

    fn get_contributor(&self, id: &str) -> Result<ContributorNode, CostarError> {
        self.store().get_contributor(id)
    }

    fn contains(&self, node: &NodeRef) -> Result<bool, CostarError> {
        self.store().contains(node)
    }

    fn neighbors(&self, node: &NodeRef) -> Result<BTreeSet<String>, CostarError> {
        self.store().neighbors(node)
    }

    fn work_count(&self) -> Result<usize, CostarError> {
        self.store().work_count()
    }

    fn contributor_count(&self) -> Result<usize, CostarError> {
        self.store().contributor_count()
    }

    fn edge_count(&self) -> Result<usize, CostarError> {
        self.store().edge_count()
    }

    fn snapshot(&self) -> Result<GraphSnapshot, CostarError> {
        self.store().snapshot()
    }
}

// =============================================================================
// GRAPH HANDLE
// =============================================================================

/// Shared handle to a graph store.
#[derive(Debug, Clone)]
pub struct GraphHandle {
    inner: Arc<RwLock<StorageBackend>>,
    kind: BackendKind,
    path: Option<PathBuf>,
}

impl Default for GraphHandle {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl GraphHandle {
    /// Wrap an existing backend. The handle is not bound to any file.
    #[must_use]
    pub fn new(backend: StorageBackend) -> Self {
        let kind = match backend {
            StorageBackend::InMemory(_) => BackendKind::Memory,
            StorageBackend::Persistent(_) => BackendKind::Redb,
        };
        Self {
            inner: Arc::new(RwLock::new(backend)),
            kind,
            path: None,
        }
    }

    /// A fresh, empty in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(StorageBackend::default())
    }

    /// Open a store of the given kind at `path`.
    ///
    /// `Memory` ignores the path. `File` loads the snapshot if the file
    /// exists (binary first, JSON second) and starts empty otherwise.
    /// `Redb` opens or creates the database.
    pub fn open(kind: BackendKind, path: impl AsRef<Path>) -> Result<Self, CostarError> {
        let path = path.as_ref();
        let backend = match kind {
            BackendKind::Memory => StorageBackend::default(),
            BackendKind::File => StorageBackend::InMemory(load_graph_file(path)?),
            BackendKind::Redb => StorageBackend::Persistent(RedbGraph::open(path)?),
        };
        tracing::debug!(backend = %kind, path = %path.display(), "opened graph store");
        Ok(Self {
            inner: Arc::new(RwLock::new(backend)),
            kind,
            path: (kind != BackendKind::Memory).then(|| path.to_path_buf()),
        })
    }

    #[must_use]
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether both handles point at the same store.
    #[must_use]
    pub fn same_store(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Persist a `File` backend to its snapshot file.
    ///
    /// A no-op for `Redb` (already durable) and `Memory` (volatile).
    pub fn save(&self) -> Result<(), CostarError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if self.kind != BackendKind::File {
            return Ok(());
        }
        let snapshot = self.snapshot()?;
        let data = export_snapshot(&snapshot)?;
        std::fs::write(path, &data)
            .map_err(|e| CostarError::Io(format!("Write {}: {}", path.display(), e)))?;
        tracing::info!(
            path = %path.display(),
            works = snapshot.works.len(),
            contributors = snapshot.contributors.len(),
            edges = snapshot.edges.len(),
            "saved graph snapshot"
        );
        Ok(())
    }

    fn read_guard(&self) -> Result<RwLockReadGuard<'_, StorageBackend>, CostarError> {
        self.inner
            .read()
            .map_err(|_| CostarError::InternalStore("graph lock poisoned".to_string()))
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, StorageBackend>, CostarError> {
        self.inner
            .write()
            .map_err(|_| CostarError::InternalStore("graph lock poisoned".to_string()))
    }

    /// Run `f` under one read lock.
    ///
    /// No write through any clone of this handle can interleave with `f`.
    pub fn read<R>(
        &self,
        f: impl FnOnce(&dyn GraphStore) -> Result<R, CostarError>,
    ) -> Result<R, CostarError> {
        let guard = self.read_guard()?;
        f(&*guard)
    }

    pub fn upsert_work(&self, id: &str, attrs: WorkAttrs) -> Result<WorkNode, CostarError> {
        self.write_guard()?.upsert_work(id, attrs)
    }

    pub fn upsert_contributor(
        &self,
        id: &str,
        attrs: ContributorAttrs,
    ) -> Result<ContributorNode, CostarError> {
        self.write_guard()?.upsert_contributor(id, attrs)
    }

    pub fn ensure_edge(&self, contributor_id: &str, work_id: &str) -> Result<bool, CostarError> {
        self.write_guard()?.ensure_edge(contributor_id, work_id)
    }

    pub fn get_work(&self, id: &str) -> Result<WorkNode, CostarError> {
        self.read_guard()?.get_work(id)
    }

    pub fn get_contributor(&self, id: &str) -> Result<ContributorNode, CostarError> {
        self.read_guard()?.get_contributor(id)
    }

    pub fn counts(&self) -> Result<GraphCounts, CostarError> {
        self.read_guard()?.counts()
    }

    pub fn snapshot(&self) -> Result<GraphSnapshot, CostarError> {
        self.read_guard()?.snapshot()
    }
}

/// Load an in-memory graph from a snapshot file; a missing file is empty.
fn load_graph_file(path: &Path) -> Result<Graph, CostarError> {
    if !path.exists() {
        return Ok(Graph::new());
    }
    let data = std::fs::read(path)
        .map_err(|e| CostarError::Io(format!("Read {}: {}", path.display(), e)))?;

    // Try the binary format first
    if let Ok(snapshot) = import_snapshot(&data) {
        return Graph::from_snapshot(&snapshot);
    }
    // Try JSON format
    if let Ok(snapshot) = import_snapshot_json(&data) {
        return Graph::from_snapshot(&snapshot);
    }
    Err(CostarError::Serialization(format!(
        "Could not parse graph file {}",
        path.display()
    )))
}

// =============================================================================
// TESTS
// =============================================================================
