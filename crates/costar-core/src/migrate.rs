//! # Replication
//!
//! Copy the full content of one store into another, reusing the idempotent
//! upsert primitives. Re-running a migration after a partial failure
//! converges to the same destination state and never double-counts edges.
//!
//! The import is not transactional as a whole. A count mismatch after
//! import is reported in the result; nothing is rolled back.

use crate::graph::GraphSnapshot;
use crate::handle::GraphHandle;
use crate::types::{CostarError, GraphCounts};
use serde::{Deserialize, Serialize};

/// What an import wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub works: usize,
    pub contributors: usize,
    /// Edges that did not exist in the destination before the import.
    pub new_edges: usize,
}

/// Result of `Migrator::migrate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Counts observed in the source snapshot.
    pub work_count: usize,
    pub contributor_count: usize,
    pub edge_count: usize,
    /// Whether the destination counts equal the source counts.
    pub verified: bool,
    /// Counts observed in the destination after import.
    pub destination: GraphCounts,
}

/// Upsert every record of `snapshot` into `destination`.
///
/// Works first, then contributors, then edges, so every edge finds its
/// endpoints. Each record takes the destination write lock on its own.
pub fn import_into(
    destination: &GraphHandle,
    snapshot: &GraphSnapshot,
) -> Result<ImportReport, CostarError> {
    let mut report = ImportReport::default();
    for work in &snapshot.works {
        destination.upsert_work(&work.id, work.to_attrs())?;
        report.works = report.works.saturating_add(1);
    }
    for person in &snapshot.contributors {
        destination.upsert_contributor(&person.id, person.to_attrs())?;
        report.contributors = report.contributors.saturating_add(1);
    }
    for edge in &snapshot.edges {
        if destination.ensure_edge(&edge.contributor_id, &edge.work_id)? {
            report.new_edges = report.new_edges.saturating_add(1);
        }
    }
    Ok(report)
}

/// Store-to-store replication.
#[derive(Debug, Clone, Copy, Default)]
pub struct Migrator;

impl Migrator {
    /// Replicate `source` into `destination` and verify counts.
    ///
    /// The source read lock is released before the first destination write,
    /// so migrating a store into itself is a harmless no-op.
    pub fn migrate(
        source: &GraphHandle,
        destination: &GraphHandle,
    ) -> Result<MigrationReport, CostarError> {
        let snapshot = source.snapshot()?;
        let expected = snapshot.counts();
        tracing::info!(
            works = expected.works,
            contributors = expected.contributors,
            edges = expected.edges,
            "migration: source snapshot taken"
        );

        let imported = import_into(destination, &snapshot)?;
        tracing::info!(new_edges = imported.new_edges, "migration: import finished");

        let observed = destination.counts()?;
        let verified = observed == expected;
        if verified {
            tracing::info!("migration: destination counts verified");
        } else {
            tracing::warn!(
                expected_works = expected.works,
                expected_contributors = expected.contributors,
                expected_edges = expected.edges,
                works = observed.works,
                contributors = observed.contributors,
                edges = observed.edges,
                "migration: destination counts differ from source"
            );
        }

        Ok(MigrationReport {
            work_count: expected.works,
            contributor_count: expected.contributors,
            edge_count: expected.edges,
            verified,
            destination: observed,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
