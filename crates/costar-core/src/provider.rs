//! # Metadata Provider
//!
//! The contract through which the upsert engine learns about a work and its
//! credits, plus the validation boundary for upstream payloads.
//!
//! Two pieces live here:
//! - `MetadataProvider`: the async trait the engine consumes. The HTTP
//!   implementation (TMDB) lives in the binary crate.
//! - `TmdbMovie` and friends: the TMDB wire schema. Anything that does not
//!   decode into it, or decodes into something invalid, is an
//!   `UpstreamFetch` error rather than a half-filled node.
//!
//! `StaticProvider` serves a fixed catalog and backs offline ingestion and
//! tests.

use crate::primitives::{MAX_CREDITS_PER_WORK, MAX_ID_LENGTH, MAX_LABEL_LENGTH};
use crate::types::{ContributorAttrs, CostarError, WorkAttrs};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// =============================================================================
// VALIDATED METADATA
// =============================================================================

/// A credited contributor as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credit {
    pub id: String,
    pub name: String,
    pub profile_path: Option<String>,
    /// Billing position; lower comes first.
    pub order: i64,
}

impl Credit {
    /// The upsert patch for this contributor.
    #[must_use]
    pub fn attrs(&self) -> ContributorAttrs {
        ContributorAttrs::new()
            .name(self.name.clone())
            .profile_path(self.profile_path.clone())
    }
}

/// One fetch result: a work and its credits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkMetadata {
    pub id: String,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    /// In provider order.
    pub credits: Vec<Credit>,
}

impl WorkMetadata {
    /// The upsert patch for the work itself. Every field is present, so the
    /// stored node converges to exactly this fetch.
    #[must_use]
    pub fn attrs(&self) -> WorkAttrs {
        WorkAttrs::new()
            .title(self.title.clone())
            .poster_path(self.poster_path.clone())
            .release_date(self.release_date.clone())
    }

    /// Check shape constraints that the store and the engine rely on.
    ///
    /// Failures are `UpstreamFetch`: the payload came from outside.
    pub fn validate(&self) -> Result<(), CostarError> {
        check_id("work id", &self.id)?;
        check_label("title", &self.title)?;
        for path in [&self.poster_path, &self.release_date].into_iter().flatten() {
            check_label("work attribute", path)?;
        }
        if self.credits.len() > MAX_CREDITS_PER_WORK {
            return Err(upstream(format!(
                "work {} lists {} credits, maximum is {}",
                self.id,
                self.credits.len(),
                MAX_CREDITS_PER_WORK
            )));
        }
        for credit in &self.credits {
            check_id("contributor id", &credit.id)?;
            check_label("contributor name", &credit.name)?;
            if let Some(path) = &credit.profile_path {
                check_label("profile path", path)?;
            }
        }
        Ok(())
    }
}

fn upstream(msg: String) -> CostarError {
    CostarError::UpstreamFetch(msg)
}

fn check_id(what: &str, id: &str) -> Result<(), CostarError> {
    if id.trim().is_empty() || id.len() > MAX_ID_LENGTH {
        return Err(upstream(format!("malformed {what} '{id}'")));
    }
    Ok(())
}

fn check_label(what: &str, value: &str) -> Result<(), CostarError> {
    if value.len() > MAX_LABEL_LENGTH {
        return Err(upstream(format!(
            "{what} of {} bytes exceeds maximum {}",
            value.len(),
            MAX_LABEL_LENGTH
        )));
    }
    Ok(())
}

// =============================================================================
// PROVIDER CONTRACT
// =============================================================================

/// Source of work metadata.
///
/// Implementations report non-success responses, transport failures and
/// malformed payloads as `CostarError::UpstreamFetch`. Timeouts are applied
/// by the caller.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch a work and its credits by id.
    async fn fetch(&self, id: &str) -> Result<WorkMetadata, CostarError>;
}

// =============================================================================
// TMDB WIRE SCHEMA
// =============================================================================

/// `GET /movie/{id}?append_to_response=credits` response body.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbMovie {
    pub id: u64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub credits: Option<TmdbCredits>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TmdbCredits {
    #[serde(default)]
    pub cast: Vec<TmdbCastMember>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TmdbCastMember {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl TryFrom<TmdbMovie> for WorkMetadata {
    type Error = CostarError;

    fn try_from(movie: TmdbMovie) -> Result<Self, Self::Error> {
        let title = non_blank(movie.title)
            .ok_or_else(|| upstream(format!("work {} has no title", movie.id)))?;

        let mut cast = movie.credits.unwrap_or_default().cast;
        // Stable: members without a billing position keep their relative order, last.
        cast.sort_by_key(|member| member.order.unwrap_or(i64::MAX));

        let mut seen = BTreeSet::new();
        let mut credits = Vec::with_capacity(cast.len().min(MAX_CREDITS_PER_WORK));
        for member in cast {
            if !seen.insert(member.id) {
                // The same person can be billed twice (two roles); one edge suffices.
                continue;
            }
            let Some(name) = non_blank(member.name) else {
                return Err(upstream(format!(
                    "cast member {} of work {} has no name",
                    member.id, movie.id
                )));
            };
            credits.push(Credit {
                id: member.id.to_string(),
                name,
                profile_path: non_blank(member.profile_path),
                order: member.order.unwrap_or(i64::MAX),
            });
            if credits.len() == MAX_CREDITS_PER_WORK {
                break;
            }
        }

        let metadata = Self {
            id: movie.id.to_string(),
            title,
            poster_path: non_blank(movie.poster_path),
            release_date: non_blank(movie.release_date),
            credits,
        };
        metadata.validate()?;
        Ok(metadata)
    }
}

/// Decode a TMDB movie body into validated metadata.
pub fn parse_tmdb_movie(body: &[u8]) -> Result<WorkMetadata, CostarError> {
    let movie: TmdbMovie = serde_json::from_slice(body)
        .map_err(|e| upstream(format!("malformed movie payload: {e}")))?;
    WorkMetadata::try_from(movie)
}

// =============================================================================
// STATIC PROVIDER
// =============================================================================

/// Serves metadata from a fixed in-memory catalog.
#[derive(Debug, Default)]
pub struct StaticProvider {
    catalog: BTreeMap<String, WorkMetadata>,
    failing: BTreeSet<String>,
    latency: Option<Duration>,
    fetches: AtomicUsize,
}

impl StaticProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON array of TMDB movie bodies.
    pub fn from_tmdb_json(data: &[u8]) -> Result<Self, CostarError> {
        let movies: Vec<TmdbMovie> = serde_json::from_slice(data)
            .map_err(|e| CostarError::Serialization(format!("catalog: {e}")))?;
        let mut provider = Self::new();
        for movie in movies {
            provider = provider.with_work(WorkMetadata::try_from(movie)?);
        }
        Ok(provider)
    }

    /// Add or replace one catalog entry.
    #[must_use]
    pub fn with_work(mut self, work: WorkMetadata) -> Self {
        self.catalog.insert(work.id.clone(), work);
        self
    }

    /// Make every fetch of `id` fail as an upstream error.
    #[must_use]
    pub fn with_failure(mut self, id: impl Into<String>) -> Self {
        self.failing.insert(id.into());
        self
    }

    /// Delay every fetch by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Ids in the catalog, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.catalog.keys().map(String::as_str)
    }

    /// Number of `fetch` calls served so far.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataProvider for StaticProvider {
    async fn fetch(&self, id: &str) -> Result<WorkMetadata, CostarError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.contains(id) {
            return Err(upstream(format!("provider returned 503 for work {id}")));
        }
        self.catalog
            .get(id)
            .cloned()
            .ok_or_else(|| upstream(format!("provider returned 404 for work {id}")))
    }
}

// =============================================================================
// TESTS
// =============================================================================
