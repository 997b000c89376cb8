//! # Path Finder
//!
//! Shortest unweighted connection between two works.
//!
//! The search is a plain breadth-first traversal over the store's adjacency
//! index, alternating work and contributor layers. It never scans the node
//! tables: each expansion is one `neighbors` lookup.
//!
//! Among several shortest paths, the one returned follows the store's
//! neighbor enumeration order. Only the length is guaranteed.

use crate::graph::GraphStore;
use crate::handle::GraphHandle;
use crate::types::{CostarError, NodeKind, NodeRef, PathStep, validate_id};
use std::collections::{BTreeMap, VecDeque};

/// Breadth-first search from `from` to `to`.
///
/// Returns the node sequence including both endpoints, `[from]` when the
/// endpoints are equal, or `None` when `to` is unreachable.
pub fn bfs_shortest_path(
    store: &dyn GraphStore,
    from: &NodeRef,
    to: &NodeRef,
) -> Result<Option<Vec<NodeRef>>, CostarError> {
    if from == to {
        return Ok(Some(vec![from.clone()]));
    }

    // child -> parent; the root maps to itself.
    let mut parents: BTreeMap<NodeRef, NodeRef> = BTreeMap::new();
    let mut queue = VecDeque::new();
    parents.insert(from.clone(), from.clone());
    queue.push_back(from.clone());

    while let Some(current) = queue.pop_front() {
        let next_kind = current.kind.opposite();
        for id in store.neighbors(&current)? {
            let next = NodeRef { kind: next_kind, id };
            if parents.contains_key(&next) {
                continue;
            }
            parents.insert(next.clone(), current.clone());
            if &next == to {
                return Ok(Some(unwind(&parents, next)));
            }
            queue.push_back(next);
        }
    }
    Ok(None)
}

fn unwind(parents: &BTreeMap<NodeRef, NodeRef>, end: NodeRef) -> Vec<NodeRef> {
    let mut path = vec![end];
    while let Some(last) = path.last() {
        match parents.get(last) {
            Some(parent) if parent != last => path.push(parent.clone()),
            _ => break,
        }
    }
    path.reverse();
    path
}

/// Resolves work-to-work connections into labeled chains.
#[derive(Debug, Clone)]
pub struct PathFinder {
    graph: GraphHandle,
}

impl PathFinder {
    #[must_use]
    pub fn new(graph: GraphHandle) -> Self {
        Self { graph }
    }

    /// Shortest chain between two works, endpoints included.
    ///
    /// Both works must already exist (`WorkNotFound` otherwise). Returns
    /// `NoPath` when they lie in different components. The whole search,
    /// labels included, runs under one read lock.
    pub fn shortest_path(&self, from: &str, to: &str) -> Result<Vec<PathStep>, CostarError> {
        validate_id(from)?;
        validate_id(to)?;
        self.graph.read(|store| {
            // Lookups double as existence checks.
            store.get_work(from)?;
            store.get_work(to)?;

            let nodes = bfs_shortest_path(store, &NodeRef::work(from), &NodeRef::work(to))?
                .ok_or_else(|| CostarError::NoPath {
                    from: from.to_string(),
                    to: to.to_string(),
                })?;
            nodes.into_iter().map(|node| label(store, node)).collect()
        })
    }
}

fn label(store: &dyn GraphStore, node: NodeRef) -> Result<PathStep, CostarError> {
    let label = match node.kind {
        NodeKind::Work => store.get_work(&node.id)?.title,
        NodeKind::Contributor => store.get_contributor(&node.id)?.name,
    };
    Ok(PathStep {
        id: node.id,
        label,
        kind: node.kind,
    })
}

// =============================================================================
// TESTS
// =============================================================================
