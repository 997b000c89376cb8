//! # Graph Store
//!
//! The node and edge index behind costar.
//!
//! This module defines the `GraphStore` trait and its in-memory
//! implementation. All data structures use `BTreeMap`/`BTreeSet` so that
//! enumeration order (neighbors, snapshots) is deterministic for a given
//! store content.

use crate::types::{
    ContributionEdge, ContributorAttrs, ContributorNode, CostarError, GraphCounts, NodeKind,
    NodeRef, WorkAttrs, WorkNode, validate_id,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// Core graph operations shared by every store implementation.
///
/// All fallible operations return `Result<T, CostarError>` so that in-memory
/// and persistent backends behave uniformly. The trait is object safe; the
/// path finder and the migrator operate on `&dyn GraphStore`.
///
/// Mutators update node tables and adjacency together: a reader never sees
/// an edge whose endpoints are missing, nor a committed edge missing from
/// either adjacency direction.
pub trait GraphStore {
    /// Create the work if absent, else overwrite the fields present in
    /// `attrs`. Returns the resulting node.
    fn upsert_work(&mut self, id: &str, attrs: WorkAttrs) -> Result<WorkNode, CostarError>;

    /// Same as [`GraphStore::upsert_work`] on the contributor namespace.
    fn upsert_contributor(
        &mut self,
        id: &str,
        attrs: ContributorAttrs,
    ) -> Result<ContributorNode, CostarError>;

    /// Link a contributor to a work. Idempotent.
    ///
    /// Returns `true` if the edge was created by this call. Fails with
    /// `Validation` if either endpoint is absent.
    fn ensure_edge(&mut self, contributor_id: &str, work_id: &str) -> Result<bool, CostarError>;

    /// Lookup a work. `WorkNotFound` if absent.
    fn get_work(&self, id: &str) -> Result<WorkNode, CostarError>;

    /// Lookup a contributor. `ContributorNotFound` if absent.
    fn get_contributor(&self, id: &str) -> Result<ContributorNode, CostarError>;

    /// Check whether a node exists in its namespace.
    fn contains(&self, node: &NodeRef) -> Result<bool, CostarError>;

    /// Ids adjacent to `node`. All of them live in the opposite namespace.
    ///
    /// An absent node has no neighbors.
    fn neighbors(&self, node: &NodeRef) -> Result<BTreeSet<String>, CostarError>;

    /// Get the total number of works.
    fn work_count(&self) -> Result<usize, CostarError>;

    /// Get the total number of contributors.
    fn contributor_count(&self) -> Result<usize, CostarError>;

    /// Get the total number of contribution edges.
    fn edge_count(&self) -> Result<usize, CostarError>;

    /// All three totals at once.
    fn counts(&self) -> Result<GraphCounts, CostarError> {
        Ok(GraphCounts {
            works: self.work_count()?,
            contributors: self.contributor_count()?,
            edges: self.edge_count()?,
        })
    }

    /// Enumerate every node and edge.
    fn snapshot(&self) -> Result<GraphSnapshot, CostarError>;
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// The in-memory graph.
///
/// Uses `BTreeMap` exclusively for deterministic ordering.
/// Adjacency is kept in both directions so `neighbors` is a single index
/// lookup regardless of which side is asked.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    works: BTreeMap<String, WorkNode>,
    contributors: BTreeMap<String, ContributorNode>,

    /// work id -> contributor ids
    cast: BTreeMap<String, BTreeSet<String>>,

    /// contributor id -> work ids
    filmography: BTreeMap<String, BTreeSet<String>>,

    edge_count: usize,
}

impl Graph {
    /// Create a new empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from a snapshot.
    ///
    /// Edges whose endpoints are missing from the snapshot are rejected.
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Result<Self, CostarError> {
        let mut graph = Self::new();
        for work in &snapshot.works {
            graph.upsert_work(&work.id, work.to_attrs())?;
        }
        for person in &snapshot.contributors {
            graph.upsert_contributor(&person.id, person.to_attrs())?;
        }
        for edge in &snapshot.edges {
            graph.ensure_edge(&edge.contributor_id, &edge.work_id)?;
        }
        Ok(graph)
    }

    /// Check if the graph contains an edge.
    #[must_use]
    pub fn contains_edge(&self, contributor_id: &str, work_id: &str) -> bool {
        self.cast
            .get(work_id)
            .is_some_and(|ids| ids.contains(contributor_id))
    }

    /// All edges in (work, contributor) order.
    pub fn edges(&self) -> impl Iterator<Item = ContributionEdge> + '_ {
        self.cast.iter().flat_map(|(work_id, ids)| {
            ids.iter()
                .map(move |contributor_id| ContributionEdge::new(contributor_id, work_id))
        })
    }
}

impl GraphStore for Graph {
    fn upsert_work(&mut self, id: &str, attrs: WorkAttrs) -> Result<WorkNode, CostarError> {
        validate_id(id)?;
        let node = match self.works.get_mut(id) {
            Some(existing) => {
                existing.apply(attrs);
                existing.clone()
            }
            None => {
                let node = WorkNode::create(id, attrs);
                self.works.insert(id.to_string(), node.clone());
                node
            }
        };
        Ok(node)
    }

    fn upsert_contributor(
        &mut self,
        id: &str,
        attrs: ContributorAttrs,
    ) -> Result<ContributorNode, CostarError> {
        validate_id(id)?;
        let node = match self.contributors.get_mut(id) {
            Some(existing) => {
                existing.apply(attrs);
                existing.clone()
            }
            None => {
                let node = ContributorNode::create(id, attrs);
                self.contributors.insert(id.to_string(), node.clone());
                node
            }
        };
        Ok(node)
    }

    fn ensure_edge(&mut self, contributor_id: &str, work_id: &str) -> Result<bool, CostarError> {
        validate_id(contributor_id)?;
        validate_id(work_id)?;
        if !self.contributors.contains_key(contributor_id) {
            return Err(CostarError::Validation(format!(
                "edge endpoint contributor {contributor_id} does not exist"
            )));
        }
        if !self.works.contains_key(work_id) {
            return Err(CostarError::Validation(format!(
                "edge endpoint work {work_id} does not exist"
            )));
        }

        let created = self
            .cast
            .entry(work_id.to_string())
            .or_default()
            .insert(contributor_id.to_string());
        if created {
            self.filmography
                .entry(contributor_id.to_string())
                .or_default()
                .insert(work_id.to_string());
            self.edge_count = self.edge_count.saturating_add(1);
        }
        Ok(created)
    }

    fn get_work(&self, id: &str) -> Result<WorkNode, CostarError> {
        self.works
            .get(id)
            .cloned()
            .ok_or_else(|| CostarError::WorkNotFound(id.to_string()))
    }

    fn get_contributor(&self, id: &str) -> Result<ContributorNode, CostarError> {
        self.contributors
            .get(id)
            .cloned()
            .ok_or_else(|| CostarError::ContributorNotFound(id.to_string()))
    }

    fn contains(&self, node: &NodeRef) -> Result<bool, CostarError> {
        Ok(match node.kind {
            NodeKind::Work => self.works.contains_key(&node.id),
            NodeKind::Contributor => self.contributors.contains_key(&node.id),
        })
    }

    fn neighbors(&self, node: &NodeRef) -> Result<BTreeSet<String>, CostarError> {
        let index = match node.kind {
            NodeKind::Work => &self.cast,
            NodeKind::Contributor => &self.filmography,
        };
        Ok(index.get(&node.id).cloned().unwrap_or_default())
    }

    fn work_count(&self) -> Result<usize, CostarError> {
        Ok(self.works.len())
    }

    fn contributor_count(&self) -> Result<usize, CostarError> {
        Ok(self.contributors.len())
    }

    fn edge_count(&self) -> Result<usize, CostarError> {
        Ok(self.edge_count)
    }

    fn snapshot(&self) -> Result<GraphSnapshot, CostarError> {
        let mut snapshot = GraphSnapshot {
            works: self.works.values().cloned().collect(),
            contributors: self.contributors.values().cloned().collect(),
            edges: self.edges().collect(),
        };
        snapshot.normalize();
        Ok(snapshot)
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Full content of a store: three record kinds, grouped by kind.
///
/// Stores produce records sorted by id within each kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub works: Vec<WorkNode>,
    pub contributors: Vec<ContributorNode>,
    pub edges: Vec<ContributionEdge>,
}

/// One record of a snapshot, for consumers that want a flat stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SnapshotRecord {
    Work(WorkNode),
    Contributor(ContributorNode),
    Edge(ContributionEdge),
}

impl GraphSnapshot {
    /// Totals observed in this snapshot.
    #[must_use]
    pub fn counts(&self) -> GraphCounts {
        GraphCounts {
            works: self.works.len(),
            contributors: self.contributors.len(),
            edges: self.edges.len(),
        }
    }

    /// Flat enumeration: works, then contributors, then edges.
    pub fn records(&self) -> impl Iterator<Item = SnapshotRecord> + '_ {
        self.works
            .iter()
            .cloned()
            .map(SnapshotRecord::Work)
            .chain(
                self.contributors
                    .iter()
                    .cloned()
                    .map(SnapshotRecord::Contributor),
            )
            .chain(self.edges.iter().cloned().map(SnapshotRecord::Edge))
    }

    /// Sort every kind by id so equal graphs compare and encode identically.
    pub fn normalize(&mut self) {
        self.works.sort_by(|a, b| a.id.cmp(&b.id));
        self.contributors.sort_by(|a, b| a.id.cmp(&b.id));
        self.edges.sort();
        self.edges.dedup();
    }
}

// =============================================================================
// TESTS
// =============================================================================
