//! # API Request/Response Types
//!
//! JSON structures for the HTTP API. The path endpoint answers with
//! `costar_core::FindPathResponse` and ingestion with
//! `costar_core::IngestReport`; everything else lives here.

use costar_core::{BackendKind, GraphCounts};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Graph status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub backend: BackendKind,
    pub works: usize,
    pub contributors: usize,
    pub edges: usize,
}

impl StatusResponse {
    pub fn new(backend: BackendKind, counts: GraphCounts) -> Self {
        Self {
            backend,
            works: counts.works,
            contributors: counts.contributors,
            edges: counts.edges,
        }
    }
}

// =============================================================================
// PATH QUERY
// =============================================================================

/// `GET /api/path` query string. Both ids are optional here so that a
/// missing one is answered with the uniform `missing parameter` body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathParams {
    #[serde(rename = "fromMovieId")]
    pub from_movie_id: Option<String>,
    #[serde(rename = "toMovieId")]
    pub to_movie_id: Option<String>,
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Generic failure body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

// =============================================================================
// EXPORT RESPONSE
// =============================================================================

/// Export response: the binary snapshot, base64 encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse {
    pub success: bool,
    pub data: Option<String>,
    pub checksum: Option<u64>,
    pub works: usize,
    pub contributors: usize,
    pub edges: usize,
    pub error: Option<String>,
}

impl ExportResponse {
    pub fn success(data: &[u8], checksum: u64, counts: GraphCounts) -> Self {
        use base64::Engine;
        Self {
            success: true,
            data: Some(base64::engine::general_purpose::STANDARD.encode(data)),
            checksum: Some(checksum),
            works: counts.works,
            contributors: counts.contributors,
            edges: counts.edges,
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            checksum: None,
            works: 0,
            contributors: 0,
            edges: 0,
            error: Some(msg.into()),
        }
    }
}
