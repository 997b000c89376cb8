//! # Core Type Definitions
//!
//! This module contains all core types for the costar graph:
//! - Node identity (`NodeKind`, `NodeRef`)
//! - Node records (`WorkNode`, `ContributorNode`) and their upsert patches
//!   (`WorkAttrs`, `ContributorAttrs`)
//! - Edge records (`ContributionEdge`)
//! - Query output (`PathStep`, `GraphCounts`)
//! - Error types (`CostarError`, `ErrorKind`)
//!
//! ## Identity
//!
//! Work and contributor ids live in separate namespaces. The same raw string
//! may name both a work and a contributor; every reference that can point at
//! either carries an explicit `NodeKind` tag.

use crate::primitives::MAX_ID_LENGTH;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// NODE IDENTITY
// =============================================================================

/// The two node namespaces of the bipartite graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A media title (film).
    Work,
    /// A person credited in a work.
    Contributor,
}

impl NodeKind {
    /// The kind on the other side of every edge touching this kind.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Work => Self::Contributor,
            Self::Contributor => Self::Work,
        }
    }

    /// Display name used in query results.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Contributor => "Contributor",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A type-tagged node reference.
///
/// Ordering is by kind first, then id, so sets of references group by
/// namespace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeRef {
    pub kind: NodeKind,
    pub id: String,
}

impl NodeRef {
    /// Reference a work node.
    #[must_use]
    pub fn work(id: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Work,
            id: id.into(),
        }
    }

    /// Reference a contributor node.
    #[must_use]
    pub fn contributor(id: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Contributor,
            id: id.into(),
        }
    }
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Reject empty, blank, or oversized identifiers.
///
/// Every store primitive runs this before touching any table.
pub fn validate_id(id: &str) -> Result<(), CostarError> {
    if id.trim().is_empty() {
        return Err(CostarError::Validation("identifier is empty".to_string()));
    }
    if id.len() > MAX_ID_LENGTH {
        return Err(CostarError::Validation(format!(
            "identifier length {} exceeds maximum {}",
            id.len(),
            MAX_ID_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// NODES
// =============================================================================

/// A media work (film) node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkNode {
    pub id: String,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
}

impl WorkNode {
    /// Build a fresh node from a patch; absent fields take their defaults.
    #[must_use]
    pub fn create(id: impl Into<String>, attrs: WorkAttrs) -> Self {
        let mut node = Self {
            id: id.into(),
            title: String::new(),
            poster_path: None,
            release_date: None,
        };
        node.apply(attrs);
        node
    }

    /// Overwrite the fields present in `attrs`, leaving the rest untouched.
    pub fn apply(&mut self, attrs: WorkAttrs) {
        if let Some(title) = attrs.title {
            self.title = title;
        }
        if let Some(poster_path) = attrs.poster_path {
            self.poster_path = poster_path;
        }
        if let Some(release_date) = attrs.release_date {
            self.release_date = release_date;
        }
    }

    /// Reconstruct the patch that reproduces every field of this node.
    #[must_use]
    pub fn to_attrs(&self) -> WorkAttrs {
        WorkAttrs {
            title: Some(self.title.clone()),
            poster_path: Some(self.poster_path.clone()),
            release_date: Some(self.release_date.clone()),
        }
    }
}

/// A contributor (cast member) node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorNode {
    pub id: String,
    pub name: String,
    pub profile_path: Option<String>,
}

impl ContributorNode {
    /// Build a fresh node from a patch; absent fields take their defaults.
    #[must_use]
    pub fn create(id: impl Into<String>, attrs: ContributorAttrs) -> Self {
        let mut node = Self {
            id: id.into(),
            name: String::new(),
            profile_path: None,
        };
        node.apply(attrs);
        node
    }

    /// Overwrite the fields present in `attrs`, leaving the rest untouched.
    pub fn apply(&mut self, attrs: ContributorAttrs) {
        if let Some(name) = attrs.name {
            self.name = name;
        }
        if let Some(profile_path) = attrs.profile_path {
            self.profile_path = profile_path;
        }
    }

    /// Reconstruct the patch that reproduces every field of this node.
    #[must_use]
    pub fn to_attrs(&self) -> ContributorAttrs {
        ContributorAttrs {
            name: Some(self.name.clone()),
            profile_path: Some(self.profile_path.clone()),
        }
    }
}

// =============================================================================
// UPSERT PATCHES
// =============================================================================

/// Attribute patch for `GraphStore::upsert_work`.
///
/// `None` leaves the stored field as is. For the optional fields,
/// `Some(None)` clears the stored value and `Some(Some(v))` sets it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkAttrs {
    pub title: Option<String>,
    pub poster_path: Option<Option<String>>,
    pub release_date: Option<Option<String>>,
}

impl WorkAttrs {
    /// An empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set or clear the poster path.
    #[must_use]
    pub fn poster_path(mut self, poster_path: Option<String>) -> Self {
        self.poster_path = Some(poster_path);
        self
    }

    /// Set or clear the release date.
    #[must_use]
    pub fn release_date(mut self, release_date: Option<String>) -> Self {
        self.release_date = Some(release_date);
        self
    }
}

/// Attribute patch for `GraphStore::upsert_contributor`.
///
/// Same presence rules as [`WorkAttrs`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContributorAttrs {
    pub name: Option<String>,
    pub profile_path: Option<Option<String>>,
}

impl ContributorAttrs {
    /// An empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set or clear the profile image path.
    #[must_use]
    pub fn profile_path(mut self, profile_path: Option<String>) -> Self {
        self.profile_path = Some(profile_path);
        self
    }
}

// =============================================================================
// EDGES
// =============================================================================

/// A credit linking a contributor to a work. Undirected, stored once per pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContributionEdge {
    pub contributor_id: String,
    pub work_id: String,
}

impl ContributionEdge {
    #[must_use]
    pub fn new(contributor_id: impl Into<String>, work_id: impl Into<String>) -> Self {
        Self {
            contributor_id: contributor_id.into(),
            work_id: work_id.into(),
        }
    }
}

// =============================================================================
// QUERY OUTPUT
// =============================================================================

/// One element of a connection chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub id: String,
    /// Title for works, name for contributors.
    pub label: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
}

/// Node and edge totals of a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphCounts {
    pub works: usize,
    pub contributors: usize,
    pub edges: usize,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Coarse error classification shared by every caller-facing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input; rejected before any write.
    Validation,
    /// Requested node or path is absent. A normal outcome.
    NotFound,
    /// The metadata source failed or timed out. Retry the whole ingestion.
    UpstreamFetch,
    /// Unexpected store failure.
    InternalStore,
}

/// Errors that can occur in costar.
///
/// - No silent failures
/// - Use `Result<T, CostarError>` for fallible operations
/// - The core never panics; storage failures surface as `InternalStore`
#[derive(Debug, Error)]
pub enum CostarError {
    /// An identifier or parameter is missing or malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The requested work does not exist.
    #[error("Work not found: {0}")]
    WorkNotFound(String),

    /// The requested contributor does not exist.
    #[error("Contributor not found: {0}")]
    ContributorNotFound(String),

    /// Both works exist but no chain of shared contributors links them.
    #[error("No connection found between {from} and {to}")]
    NoPath { from: String, to: String },

    /// The metadata provider returned an error, a malformed body, or timed out.
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetch(String),

    /// The backing store failed.
    #[error("Store error: {0}")]
    InternalStore(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl CostarError {
    /// Classify this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::WorkNotFound(_) | Self::ContributorNotFound(_) | Self::NoPath { .. } => {
                ErrorKind::NotFound
            }
            Self::UpstreamFetch(_) => ErrorKind::UpstreamFetch,
            Self::InternalStore(_) | Self::Serialization(_) | Self::Io(_) => {
                ErrorKind::InternalStore
            }
        }
    }

    /// Whether this is an expected outcome rather than a fault.
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::NotFound)
    }
}

// =============================================================================
// TESTS
// =============================================================================
