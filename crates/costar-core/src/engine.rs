//! # Upsert Engine
//!
//! Fetch a work from the metadata provider and converge the graph onto it.
//!
//! - Validate the id before anything else
//! - Fetch under a timeout; on any upstream failure write nothing
//! - Upsert the work, then each credited contributor and its edge, in
//!   provider order
//!
//! Every write goes through the idempotent store primitives, so repeating an
//! ingestion with the same upstream data leaves the graph unchanged, and
//! retrying after a partial failure repairs whatever was missing.
//!
//! Concurrent ingestions of different ids run fully in parallel. Ingestions
//! of the same id fetch concurrently but take turns on a per-id lock for
//! their write phase, so attribute fields from two fetches never interleave.

use crate::handle::GraphHandle;
use crate::primitives::DEFAULT_FETCH_TIMEOUT_MS;
use crate::provider::{MetadataProvider, WorkMetadata};
use crate::types::{CostarError, validate_id};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinSet;

type WriteSlot = Arc<tokio::sync::Mutex<()>>;

/// A caller's claim on a per-id write slot.
///
/// Dropping it removes the slot from the table once no other caller holds
/// it, including when the owning future is cancelled mid-wait.
struct SlotGuard {
    table: Arc<Mutex<BTreeMap<String, WriteSlot>>>,
    work_id: String,
    slot: WriteSlot,
}

impl std::ops::Deref for SlotGuard {
    type Target = tokio::sync::Mutex<()>;

    fn deref(&self) -> &Self::Target {
        &self.slot
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        match self.table.lock() {
            Ok(mut inflight) => {
                // One reference in the table, one here: nobody else is waiting.
                if Arc::strong_count(&self.slot) == 2 {
                    inflight.remove(&self.work_id);
                }
            }
            Err(_) => tracing::error!(work_id = %self.work_id, "in-flight table poisoned"),
        }
    }
}

/// Outcome of one successful `ensure_work`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub work_id: String,
    pub title: String,
    /// Credits written (contributor upserts).
    pub credits: usize,
    /// Edges that did not exist before this call.
    pub new_edges: usize,
}

/// Outcome of a bulk ingestion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchReport {
    pub ingested: Vec<IngestReport>,
    /// (work id, error message)
    pub failed: Vec<(String, String)>,
}

/// The ingestion engine. Cheap to clone; clones share the store, the
/// provider and the per-id write locks.
#[derive(Clone)]
pub struct UpsertEngine {
    graph: GraphHandle,
    provider: Arc<dyn MetadataProvider>,
    fetch_timeout: Duration,
    inflight: Arc<Mutex<BTreeMap<String, WriteSlot>>>,
}

impl std::fmt::Debug for UpsertEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpsertEngine")
            .field("graph", &self.graph)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl UpsertEngine {
    /// Create an engine with the default fetch timeout.
    pub fn new(graph: GraphHandle, provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            graph,
            provider,
            fetch_timeout: Duration::from_millis(DEFAULT_FETCH_TIMEOUT_MS),
            inflight: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Bound every provider fetch by `timeout`.
    #[must_use]
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn graph(&self) -> &GraphHandle {
        &self.graph
    }

    /// Ensure a work and all its credits are present in the graph.
    pub async fn ensure_work(&self, work_id: &str) -> Result<IngestReport, CostarError> {
        validate_id(work_id)?;

        let metadata = self.fetch(work_id).await?;
        let report = self.write_phase(&metadata).await?;

        tracing::debug!(
            work_id = %report.work_id,
            credits = report.credits,
            new_edges = report.new_edges,
            "work ensured"
        );
        Ok(report)
    }

    /// Write-phase barrier: ensure both works, concurrently.
    ///
    /// Completes only once both ingestions succeeded; the first failure is
    /// returned as is. Equal ids are ingested once.
    pub async fn ensure_pair(
        &self,
        a: &str,
        b: &str,
    ) -> Result<(IngestReport, IngestReport), CostarError> {
        validate_id(a)?;
        validate_id(b)?;
        if a == b {
            let report = self.ensure_work(a).await?;
            return Ok((report.clone(), report));
        }
        tokio::try_join!(self.ensure_work(a), self.ensure_work(b))
    }

    /// Ingest many works with at most `concurrency` in flight.
    ///
    /// Failures are collected, not propagated: one bad id does not stop
    /// the batch.
    pub async fn ensure_all(&self, ids: Vec<String>, concurrency: usize) -> BatchReport {
        let limit = concurrency.max(1);
        let mut report = BatchReport::default();
        let mut tasks = JoinSet::new();
        let mut pending = ids.into_iter();

        loop {
            while tasks.len() < limit {
                let Some(id) = pending.next() else { break };
                let engine = self.clone();
                tasks.spawn(async move {
                    let outcome = engine.ensure_work(&id).await;
                    (id, outcome)
                });
            }
            let Some(joined) = tasks.join_next().await else {
                break;
            };
            match joined {
                Ok((_, Ok(ingested))) => report.ingested.push(ingested),
                Ok((id, Err(e))) => {
                    if e.is_expected() {
                        tracing::debug!(work_id = %id, error = %e, "ingestion rejected");
                    } else {
                        tracing::warn!(work_id = %id, error = %e, "ingestion failed");
                    }
                    report.failed.push((id, e.to_string()));
                }
                Err(e) => {
                    tracing::error!(error = %e, "ingestion task aborted");
                    report.failed.push((String::new(), e.to_string()));
                }
            }
        }
        report
    }

    async fn fetch(&self, work_id: &str) -> Result<WorkMetadata, CostarError> {
        let metadata =
            match tokio::time::timeout(self.fetch_timeout, self.provider.fetch(work_id)).await {
                Ok(Ok(metadata)) => metadata,
                Ok(Err(CostarError::UpstreamFetch(msg))) => {
                    tracing::warn!(work_id, error = %msg, "metadata fetch failed");
                    return Err(CostarError::UpstreamFetch(msg));
                }
                Ok(Err(other)) => {
                    tracing::warn!(work_id, error = %other, "metadata fetch failed");
                    return Err(CostarError::UpstreamFetch(other.to_string()));
                }
                Err(_) => {
                    tracing::warn!(
                        work_id,
                        timeout_ms = self.fetch_timeout.as_millis() as u64,
                        "metadata fetch timed out"
                    );
                    return Err(CostarError::UpstreamFetch(format!(
                        "fetch of work {} timed out after {}ms",
                        work_id,
                        self.fetch_timeout.as_millis()
                    )));
                }
            };

        metadata.validate()?;
        if metadata.id != work_id {
            return Err(CostarError::UpstreamFetch(format!(
                "provider answered with work {} when asked for {}",
                metadata.id, work_id
            )));
        }
        Ok(metadata)
    }

    async fn write_phase(&self, metadata: &WorkMetadata) -> Result<IngestReport, CostarError> {
        let slot = self.acquire_slot(&metadata.id)?;
        let _turn = slot.lock().await;
        self.apply(metadata)
    }

    /// Store writes for one fetched work. Stops at the first store error;
    /// everything before it stays committed.
    fn apply(&self, metadata: &WorkMetadata) -> Result<IngestReport, CostarError> {
        let work = self.graph.upsert_work(&metadata.id, metadata.attrs())?;
        let mut new_edges = 0usize;
        for credit in &metadata.credits {
            self.graph.upsert_contributor(&credit.id, credit.attrs())?;
            if self.graph.ensure_edge(&credit.id, &work.id)? {
                new_edges = new_edges.saturating_add(1);
            }
        }
        Ok(IngestReport {
            work_id: work.id,
            title: work.title,
            credits: metadata.credits.len(),
            new_edges,
        })
    }

    fn acquire_slot(&self, work_id: &str) -> Result<SlotGuard, CostarError> {
        let mut inflight = self
            .inflight
            .lock()
            .map_err(|_| CostarError::InternalStore("in-flight table poisoned".to_string()))?;
        let slot = Arc::clone(inflight.entry(work_id.to_string()).or_default());
        Ok(SlotGuard {
            table: Arc::clone(&self.inflight),
            work_id: work_id.to_string(),
            slot,
        })
    }

    #[cfg(test)]
    fn inflight_len(&self) -> usize {
        self.inflight.lock().map(|m| m.len()).unwrap_or(usize::MAX)
    }
}

// =============================================================================
// TESTS
// =============================================================================
