//! # API Endpoint Handlers

use super::{
    AppState,
    types::{ErrorResponse, ExportResponse, HealthResponse, PathParams, StatusResponse},
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use costar_core::{CostarError, ErrorKind, FindPathResponse, export_snapshot, snapshot_checksum};

/// HTTP status for an engine error.
pub fn status_for(error: &CostarError) -> StatusCode {
    match error.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::UpstreamFetch => StatusCode::BAD_GATEWAY,
        ErrorKind::InternalStore => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Expected outcomes stay at debug; faults are surfaced.
fn log_failure(operation: &'static str, error: &CostarError) {
    match error.kind() {
        ErrorKind::Validation | ErrorKind::NotFound => {
            tracing::debug!(operation, error = %error, "request not satisfied");
        }
        ErrorKind::UpstreamFetch => tracing::warn!(operation, error = %error, "upstream failure"),
        ErrorKind::InternalStore => tracing::error!(operation, error = %error, "store failure"),
    }
}

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Work, contributor and edge counts.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let graph = state.graph();
    match graph.counts() {
        Ok(counts) => (
            StatusCode::OK,
            Json(StatusResponse::new(graph.kind(), counts)),
        )
            .into_response(),
        Err(e) => {
            log_failure("status", &e);
            (status_for(&e), Json(ErrorResponse::new(e.to_string()))).into_response()
        }
    }
}

// =============================================================================
// PATH HANDLER
// =============================================================================

/// `GET /api/path?fromMovieId=..&toMovieId=..`
///
/// Fetches both works (and their casts) if needed, then answers with the
/// shortest chain between them.
pub async fn path_handler(
    State(state): State<AppState>,
    Query(params): Query<PathParams>,
) -> impl IntoResponse {
    let result = state
        .query
        .find_path(
            params.from_movie_id.as_deref(),
            params.to_movie_id.as_deref(),
        )
        .await;

    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            log_failure("find_path", e);
            status_for(e)
        }
    };
    (status, Json(FindPathResponse::from_result(&result)))
}

// =============================================================================
// INGEST HANDLER
// =============================================================================

/// `POST /works/{id}`: ensure one work and its credits are in the graph.
pub async fn ingest_work_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.query.engine().ensure_work(&id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            log_failure("ensure_work", &e);
            (status_for(&e), Json(ErrorResponse::new(e.to_string()))).into_response()
        }
    }
}

// =============================================================================
// EXPORT HANDLER
// =============================================================================

/// `GET /export`: the binary snapshot, base64 encoded.
pub async fn export_handler(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = match state.graph().snapshot() {
        Ok(s) => s,
        Err(e) => {
            log_failure("export", &e);
            return (
                status_for(&e),
                Json(ExportResponse::error(format!("Failed to snapshot graph: {}", e))),
            );
        }
    };

    match export_snapshot(&snapshot) {
        Ok(data) => (
            StatusCode::OK,
            Json(ExportResponse::success(
                &data,
                snapshot_checksum(&snapshot),
                snapshot.counts(),
            )),
        ),
        Err(e) => {
            log_failure("export", &e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExportResponse::error(format!("Export failed: {}", e))),
            )
        }
    }
}
