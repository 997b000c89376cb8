//! # Property-Based Tests
//!
//! Shortest-path and idempotence invariants over random bipartite graphs.
//! Expected distances come from a separate brute-force BFS over the raw edge
//! list, never from the store's adjacency index.

#![allow(clippy::unwrap_used, clippy::panic)]

use costar_core::{
    ContributorAttrs, Graph, GraphStore, NodeKind, NodeRef, WorkAttrs, bfs_shortest_path,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

const WORKS: u8 = 8;
const CONTRIBUTORS: u8 = 8;

fn work_id(i: u8) -> String {
    format!("w{i}")
}

fn person_id(i: u8) -> String {
    format!("c{i}")
}

fn build(edges: &[(u8, u8)]) -> Graph {
    let mut graph = Graph::new();
    for w in 0..WORKS {
        graph
            .upsert_work(&work_id(w), WorkAttrs::new().title(format!("Work {w}")))
            .expect("work");
    }
    for c in 0..CONTRIBUTORS {
        graph
            .upsert_contributor(&person_id(c), ContributorAttrs::new().name(format!("P{c}")))
            .expect("contributor");
    }
    for (c, w) in edges {
        graph.ensure_edge(&person_id(*c), &work_id(*w)).expect("edge");
    }
    graph
}

/// Hop distance between two works over the raw edge list.
fn brute_force_distance(edges: &[(u8, u8)], from: u8, to: u8) -> Option<usize> {
    let mut adjacency: BTreeMap<(bool, u8), BTreeSet<(bool, u8)>> = BTreeMap::new();
    for (c, w) in edges {
        adjacency.entry((true, *w)).or_default().insert((false, *c));
        adjacency.entry((false, *c)).or_default().insert((true, *w));
    }
    let start = (true, from);
    let goal = (true, to);
    let mut dist = BTreeMap::new();
    dist.insert(start, 0usize);
    let mut queue = VecDeque::from([start]);
    while let Some(node) = queue.pop_front() {
        let d = dist[&node];
        if node == goal {
            return Some(d);
        }
        for next in adjacency.get(&node).into_iter().flatten() {
            if !dist.contains_key(next) {
                dist.insert(*next, d + 1);
                queue.push_back(*next);
            }
        }
    }
    None
}

fn edge_strategy() -> impl Strategy<Value = Vec<(u8, u8)>> {
    vec((0..CONTRIBUTORS, 0..WORKS), 0..24)
}

proptest! {
    /// Returned path length equals the brute-force shortest distance.
    #[test]
    fn path_is_optimal(edges in edge_strategy(), from in 0..WORKS, to in 0..WORKS) {
        let graph = build(&edges);
        let path = bfs_shortest_path(
            &graph,
            &NodeRef::work(work_id(from)),
            &NodeRef::work(work_id(to)),
        )
        .expect("bfs");
        let expected = brute_force_distance(&edges, from, to);
        prop_assert_eq!(path.map(|p| p.len() - 1), expected);
    }

    /// Every hop of a returned path is an existing edge and alternates kinds.
    #[test]
    fn path_follows_edges(edges in edge_strategy(), from in 0..WORKS, to in 0..WORKS) {
        let graph = build(&edges);
        let path = bfs_shortest_path(
            &graph,
            &NodeRef::work(work_id(from)),
            &NodeRef::work(work_id(to)),
        )
        .expect("bfs");
        if let Some(path) = path {
            for pair in path.windows(2) {
                let (a, b) = (&pair[0], &pair[1]);
                prop_assert_ne!(a.kind, b.kind);
                let (person, work) = match a.kind {
                    NodeKind::Contributor => (&a.id, &b.id),
                    NodeKind::Work => (&b.id, &a.id),
                };
                prop_assert!(graph.contains_edge(person, work));
            }
        }
    }

    /// Lengths agree in both directions.
    #[test]
    fn path_length_is_symmetric(edges in edge_strategy(), a in 0..WORKS, b in 0..WORKS) {
        let graph = build(&edges);
        let forward = bfs_shortest_path(
            &graph,
            &NodeRef::work(work_id(a)),
            &NodeRef::work(work_id(b)),
        )
        .expect("bfs")
        .map(|p| p.len());
        let backward = bfs_shortest_path(
            &graph,
            &NodeRef::work(work_id(b)),
            &NodeRef::work(work_id(a)),
        )
        .expect("bfs")
        .map(|p| p.len());
        prop_assert_eq!(forward, backward);
    }

    /// A work always reaches itself in zero hops.
    #[test]
    fn trivial_path(edges in edge_strategy(), a in 0..WORKS) {
        let graph = build(&edges);
        let path = bfs_shortest_path(
            &graph,
            &NodeRef::work(work_id(a)),
            &NodeRef::work(work_id(a)),
        )
            .expect("bfs")
            .expect("path");
        prop_assert_eq!(path, vec![NodeRef::work(work_id(a))]);
    }

    /// Replaying the same writes leaves the graph unchanged.
    #[test]
    fn replay_is_idempotent(edges in edge_strategy()) {
        let mut graph = build(&edges);
        let before = graph.snapshot().expect("snapshot");
        for (c, w) in &edges {
            prop_assert!(!graph.ensure_edge(&person_id(*c), &work_id(*w)).expect("edge"));
        }
        prop_assert_eq!(graph.snapshot().expect("snapshot"), before);

        let distinct: BTreeSet<_> = edges.iter().collect();
        prop_assert_eq!(graph.edge_count().expect("count"), distinct.len());
    }
}
