//! # costar-core
//!
//! The graph engine behind costar: a bipartite graph of works (films) and
//! contributors (cast members), grown incrementally from a metadata source
//! and queried for the shortest chain of shared contributors between two
//! works.
//!
//! ## Components
//!
//! - `GraphStore` (`graph`, `storage`): node tables plus a two-way adjacency
//!   index, in memory or on redb
//! - `GraphHandle` (`handle`): the shared, lock-protected store passed to
//!   every component
//! - `UpsertEngine` (`engine`): fetch-then-upsert ingestion
//! - `PathFinder` (`path`): breadth-first shortest connection
//! - `Migrator` (`migrate`): store-to-store replication with count checks
//!
//! ## Architectural Constraints
//!
//! - No process-wide state: stores and providers are injected
//! - Deterministic enumeration: `BTreeMap`/`BTreeSet` only
//! - The only suspension point is `MetadataProvider::fetch`
//! - Nothing is ever deleted

// =============================================================================
// MODULES
// =============================================================================

pub mod engine;
pub mod export;
pub mod graph;
pub mod handle;
pub mod migrate;
pub mod path;
pub mod primitives;
pub mod provider;
pub mod query;
pub mod storage;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    ContributionEdge, ContributorAttrs, ContributorNode, CostarError, ErrorKind, GraphCounts,
    NodeKind, NodeRef, PathStep, WorkAttrs, WorkNode,
};

// =============================================================================
// RE-EXPORTS: Graph Engine
// =============================================================================

pub use engine::{BatchReport, IngestReport, UpsertEngine};
pub use export::{
    SnapshotHeader, export_snapshot, export_snapshot_json, import_snapshot, import_snapshot_json,
    snapshot_checksum,
};
pub use graph::{Graph, GraphSnapshot, GraphStore, SnapshotRecord};
pub use handle::{BackendKind, GraphHandle, StorageBackend};
pub use migrate::{ImportReport, MigrationReport, Migrator, import_into};
pub use path::{PathFinder, bfs_shortest_path};
pub use provider::{Credit, MetadataProvider, StaticProvider, WorkMetadata, parse_tmdb_movie};
pub use query::{FindPathResponse, MISSING_PARAMETER, NO_CONNECTION, PathQuery};
pub use storage::RedbGraph;
