//! End-to-end scenarios: ingestion through a provider, path queries, and
//! store-to-store migration across backends.

#![allow(clippy::unwrap_used, clippy::panic)]

use costar_core::{
    BackendKind, CostarError, Credit, GraphCounts, GraphHandle, Migrator, NodeKind, PathFinder,
    PathQuery, StaticProvider, UpsertEngine, WorkMetadata,
};
use std::sync::Arc;
use tempfile::tempdir;

fn work(id: &str, title: &str, cast: &[(&str, &str)]) -> WorkMetadata {
    WorkMetadata {
        id: id.to_string(),
        title: title.to_string(),
        poster_path: Some(format!("/{id}.jpg")),
        release_date: Some("2000-01-01".to_string()),
        credits: cast
            .iter()
            .enumerate()
            .map(|(i, (cid, name))| Credit {
                id: (*cid).to_string(),
                name: (*name).to_string(),
                profile_path: None,
                order: i as i64,
            })
            .collect(),
    }
}

fn engine(provider: StaticProvider) -> UpsertEngine {
    UpsertEngine::new(GraphHandle::in_memory(), Arc::new(provider))
}

#[tokio::test]
async fn shared_contributor_links_two_works() {
    let engine = engine(
        StaticProvider::new()
            .with_work(work("A", "Work A", &[("c1", "Contributor One")]))
            .with_work(work("B", "Work B", &[("c1", "Contributor One")])),
    );
    engine.ensure_work("A").await.expect("ingest A");
    engine.ensure_work("B").await.expect("ingest B");

    let chain = PathFinder::new(engine.graph().clone())
        .shortest_path("A", "B")
        .expect("path");
    let rendered: Vec<(&str, NodeKind)> = chain.iter().map(|s| (s.id.as_str(), s.kind)).collect();
    assert_eq!(
        rendered,
        vec![
            ("A", NodeKind::Work),
            ("c1", NodeKind::Contributor),
            ("B", NodeKind::Work),
        ]
    );
    assert_eq!(chain.len() - 1, 2);
}

#[tokio::test]
async fn disjoint_casts_have_no_path() {
    let engine = engine(
        StaticProvider::new()
            .with_work(work("A", "Work A", &[("c1", "One"), ("c2", "Two")]))
            .with_work(work("C", "Work C", &[("c3", "Three")])),
    );
    engine.ensure_work("A").await.expect("ingest A");
    engine.ensure_work("C").await.expect("ingest C");

    let err = PathFinder::new(engine.graph().clone())
        .shortest_path("A", "C")
        .expect_err("disconnected");
    assert!(matches!(err, CostarError::NoPath { .. }));
    assert!(err.is_expected());
}

#[tokio::test]
async fn migration_of_three_five_seven() {
    // 3 works, 5 contributors, 7 edges.
    let engine = engine(
        StaticProvider::new()
            .with_work(work("1", "One", &[("a", "A"), ("b", "B"), ("c", "C")]))
            .with_work(work("2", "Two", &[("c", "C"), ("d", "D")]))
            .with_work(work("3", "Three", &[("d", "D"), ("e", "E")])),
    );
    for id in ["1", "2", "3"] {
        engine.ensure_work(id).await.expect("ingest");
    }
    let source = engine.graph().clone();
    let expected = GraphCounts {
        works: 3,
        contributors: 5,
        edges: 7,
    };
    assert_eq!(source.counts().expect("counts"), expected);

    let temp = tempdir().expect("temp dir");
    let destination =
        GraphHandle::open(BackendKind::Redb, temp.path().join("dest.redb")).expect("open");

    let first = Migrator::migrate(&source, &destination).expect("migrate");
    assert!(first.verified);
    assert_eq!(first.destination, expected);

    let second = Migrator::migrate(&source, &destination).expect("re-migrate");
    assert!(second.verified);
    assert_eq!(destination.counts().expect("counts"), expected);
}

#[tokio::test]
async fn repeated_ingestion_converges() {
    let provider = StaticProvider::new().with_work(work(
        "603",
        "The Matrix",
        &[("6384", "Keanu Reeves"), ("2975", "Laurence Fishburne")],
    ));
    let engine = engine(provider);

    engine.ensure_work("603").await.expect("first");
    let once = engine.graph().snapshot().expect("snapshot");
    for _ in 0..3 {
        engine.ensure_work("603").await.expect("again");
    }
    assert_eq!(engine.graph().snapshot().expect("snapshot"), once);
}

#[tokio::test]
async fn path_query_over_redb_backend() {
    let temp = tempdir().expect("temp dir");
    let graph = GraphHandle::open(BackendKind::Redb, temp.path().join("graph.redb")).expect("open");
    let provider = StaticProvider::new()
        .with_work(work("1", "One", &[("a", "A")]))
        .with_work(work("2", "Two", &[("a", "A"), ("b", "B")]))
        .with_work(work("3", "Three", &[("b", "B")]));
    let query = PathQuery::new(UpsertEngine::new(graph.clone(), Arc::new(provider)));

    // Only 1 and 3 are fetched; 2 was never ingested, so they are unreachable.
    let err = query
        .find_path(Some("1"), Some("3"))
        .await
        .expect_err("not yet connected");
    assert!(matches!(err, CostarError::NoPath { .. }));

    query.engine().ensure_work("2").await.expect("ingest bridge");
    let chain = query.find_path(Some("1"), Some("3")).await.expect("path");
    assert_eq!(chain.len(), 5);
    assert_eq!(chain.first().map(|s| s.label.as_str()), Some("One"));
    assert_eq!(chain.last().map(|s| s.label.as_str()), Some("Three"));
}
