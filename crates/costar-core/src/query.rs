//! # Path Query Surface
//!
//! The two-phase "connect these works" operation exposed to the HTTP and CLI
//! layers:
//!
//! 1. Write phase: ensure both works (and their credits) are in the graph.
//!    Both ingestions must complete before anything is read.
//! 2. Read phase: breadth-first search between them.
//!
//! The phases are not atomic together. Unrelated ingestions may land between
//! them; the answer is consistent with some interleaving of those writes.

use crate::engine::UpsertEngine;
use crate::path::PathFinder;
use crate::types::{CostarError, ErrorKind, PathStep};
use serde::{Deserialize, Serialize};

/// Error body for a missing or blank endpoint id.
pub const MISSING_PARAMETER: &str = "missing parameter";

/// Error body when the works are not connected.
pub const NO_CONNECTION: &str = "no connection found";

/// Caller-facing result of a path query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FindPathResponse {
    Chain { chain: Vec<PathStep> },
    Error { error: String },
}

impl FindPathResponse {
    /// Collapse an engine result onto the caller-facing shape.
    ///
    /// Validation failures become [`MISSING_PARAMETER`], any not-found outcome
    /// becomes [`NO_CONNECTION`], everything else carries its message.
    #[must_use]
    pub fn from_result(result: &Result<Vec<PathStep>, CostarError>) -> Self {
        match result {
            Ok(chain) => Self::Chain {
                chain: chain.clone(),
            },
            Err(e) => Self::Error {
                error: match e.kind() {
                    ErrorKind::Validation => MISSING_PARAMETER.to_string(),
                    ErrorKind::NotFound => NO_CONNECTION.to_string(),
                    ErrorKind::UpstreamFetch | ErrorKind::InternalStore => e.to_string(),
                },
            },
        }
    }
}

/// Ingest-then-search over one engine and its store.
#[derive(Debug, Clone)]
pub struct PathQuery {
    engine: UpsertEngine,
    finder: PathFinder,
}

impl PathQuery {
    #[must_use]
    pub fn new(engine: UpsertEngine) -> Self {
        let finder = PathFinder::new(engine.graph().clone());
        Self { engine, finder }
    }

    #[must_use]
    pub fn engine(&self) -> &UpsertEngine {
        &self.engine
    }

    /// Find the shortest chain between two works, fetching them first.
    ///
    /// Parameters arrive as the caller received them: absent or blank ids are
    /// a `Validation` error raised before any fetch.
    pub async fn find_path(
        &self,
        from: Option<&str>,
        to: Option<&str>,
    ) -> Result<Vec<PathStep>, CostarError> {
        let (Some(from), Some(to)) = (non_blank(from), non_blank(to)) else {
            return Err(CostarError::Validation(MISSING_PARAMETER.to_string()));
        };

        self.engine.ensure_pair(from, to).await?;
        let chain = self.finder.shortest_path(from, to)?;
        tracing::debug!(from, to, hops = chain.len().saturating_sub(1), "path found");
        Ok(chain)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =============================================================================
// TESTS
// =============================================================================
