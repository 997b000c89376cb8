//! Integration tests for the costar HTTP API.
//!
//! Uses axum-test to exercise the router without binding a socket. The
//! metadata provider is an in-memory catalog, so no test touches the network.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::{HeaderValue, StatusCode, header};
use axum_test::TestServer;
use base64::Engine;
use costar::api::{AppState, ExportResponse, HealthResponse, StatusResponse, create_router};
use costar::config::SecurityConfig;
use costar_core::{
    BackendKind, Credit, FindPathResponse, GraphHandle, IngestReport, NodeKind, StaticProvider,
    UpsertEngine, WorkMetadata, import_snapshot,
};
use std::sync::Arc;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn work(id: &str, title: &str, cast: &[(&str, &str)]) -> WorkMetadata {
    WorkMetadata {
        id: id.to_string(),
        title: title.to_string(),
        poster_path: None,
        release_date: None,
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

/// 603 and 604 share Keanu Reeves; 13 shares nobody; 500 always fails.
fn catalog() -> StaticProvider {
    StaticProvider::new()
        .with_work(work(
            "603",
            "The Matrix",
            &[("6384", "Keanu Reeves"), ("2975", "Laurence Fishburne")],
        ))
        .with_work(work(
            "604",
            "The Matrix Reloaded",
            &[("6384", "Keanu Reeves")],
        ))
        .with_work(work("13", "Forrest Gump", &[("31", "Tom Hanks")]))
        .with_failure("500")
}

fn state_with(security: SecurityConfig) -> AppState {
    let engine = UpsertEngine::new(GraphHandle::in_memory(), Arc::new(catalog()));
    AppState::new(engine).with_security(security)
}

/// No auth, no rate limit.
fn open_security() -> SecurityConfig {
    SecurityConfig {
        rate_limit: 0,
        ..SecurityConfig::default()
    }
}

fn create_test_server() -> TestServer {
    TestServer::new(create_router(state_with(open_security()))).unwrap()
}

fn bearer(key: &str) -> HeaderValue {
    format!("Bearer {key}").parse::<HeaderValue>().unwrap()
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let server = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_empty_graph() {
    let server = create_test_server();

    let response = server.get("/status").await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.backend, BackendKind::Memory);
    assert_eq!((status.works, status.contributors, status.edges), (0, 0, 0));
}

// =============================================================================
// PATH ENDPOINT
// =============================================================================

#[tokio::test]
async fn test_path_between_linked_works() {
    let server = create_test_server();

    let response = server.get("/api/path?fromMovieId=603&toMovieId=604").await;

    response.assert_status_ok();
    let FindPathResponse::Chain { chain } = response.json::<FindPathResponse>() else {
        panic!("expected a chain");
    };
    let steps: Vec<(&str, &str, NodeKind)> = chain
        .iter()
        .map(|s| (s.id.as_str(), s.label.as_str(), s.kind))
        .collect();
    assert_eq!(
        steps,
        vec![
            ("603", "The Matrix", NodeKind::Work),
            ("6384", "Keanu Reeves", NodeKind::Contributor),
            ("604", "The Matrix Reloaded", NodeKind::Work),
        ]
    );
}

#[tokio::test]
async fn test_path_wire_shape() {
    let server = create_test_server();

    let body: serde_json::Value = server
        .get("/api/path?fromMovieId=603&toMovieId=603")
        .await
        .json();

    assert_eq!(
        body,
        serde_json::json!({"chain": [{"id": "603", "label": "The Matrix", "type": "Work"}]})
    );
}

#[tokio::test]
async fn test_path_missing_parameter() {
    let server = create_test_server();

    for url in [
        "/api/path",
        "/api/path?fromMovieId=603",
        "/api/path?toMovieId=603",
        "/api/path?fromMovieId=&toMovieId=603",
    ] {
        let response = server.get(url).await;
        response.assert_status_bad_request();
        let body: serde_json::Value = response.json();
        assert_eq!(body, serde_json::json!({"error": "missing parameter"}), "{url}");
    }
}

#[tokio::test]
async fn test_path_no_connection() {
    let server = create_test_server();

    let response = server.get("/api/path?fromMovieId=603&toMovieId=13").await;

    response.assert_status_not_found();
    let body: serde_json::Value = response.json();
    assert_eq!(body, serde_json::json!({"error": "no connection found"}));
}

#[tokio::test]
async fn test_path_upstream_failure_is_bad_gateway() {
    let server = create_test_server();

    let response = server.get("/api/path?fromMovieId=603&toMovieId=500").await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let FindPathResponse::Error { error } = response.json::<FindPathResponse>() else {
        panic!("expected an error body");
    };
    assert!(error.contains("503"), "{error}");
}

#[tokio::test]
async fn test_path_ingests_both_works() {
    let server = create_test_server();

    server
        .get("/api/path?fromMovieId=603&toMovieId=13")
        .await
        .assert_status_not_found();

    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!((status.works, status.contributors, status.edges), (2, 3, 3));
}

// =============================================================================
// INGEST ENDPOINT
// =============================================================================

#[tokio::test]
async fn test_ingest_work() {
    let server = create_test_server();

    let response = server.post("/works/603").await;

    response.assert_status_ok();
    let report: IngestReport = response.json();
    assert_eq!(report.work_id, "603");
    assert_eq!(report.credits, 2);
    assert_eq!(report.new_edges, 2);

    let again: IngestReport = server.post("/works/603").await.json();
    assert_eq!(again.new_edges, 0);
}

#[tokio::test]
async fn test_ingest_unknown_work_is_bad_gateway() {
    let server = create_test_server();

    let response = server.post("/works/999").await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let status: StatusResponse = server.get("/status").await.json();
    assert_eq!(status.works, 0);
}

// =============================================================================
// EXPORT ENDPOINT
// =============================================================================

#[tokio::test]
async fn test_export_decodes_to_snapshot() {
    let server = create_test_server();
    server.post("/works/603").await.assert_status_ok();
    server.post("/works/604").await.assert_status_ok();

    let response = server.get("/export").await;

    response.assert_status_ok();
    let export: ExportResponse = response.json();
    assert!(export.success);
    assert_eq!((export.works, export.contributors, export.edges), (2, 2, 3));

    let data = base64::engine::general_purpose::STANDARD
        .decode(export.data.unwrap())
        .unwrap();
    let snapshot = import_snapshot(&data).unwrap();
    assert_eq!(snapshot.edges.len(), 3);
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

fn create_auth_test_server(api_key: &str) -> TestServer {
    let security = SecurityConfig {
        api_key: Some(api_key.to_string()),
        ..open_security()
    };
    TestServer::new(create_router(state_with(security))).unwrap()
}

#[tokio::test]
async fn test_auth_valid_bearer_token() {
    let server = create_auth_test_server("test-secret-key-12345");

    let response = server
        .get("/status")
        .add_header(header::AUTHORIZATION, bearer("test-secret-key-12345"))
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_valid_raw_token() {
    let server = create_auth_test_server("raw-key");

    let response = server
        .get("/status")
        .add_header(header::AUTHORIZATION, "raw-key".parse::<HeaderValue>().unwrap())
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_auth_invalid_token_rejected() {
    let server = create_auth_test_server("correct-key");

    let response = server
        .get("/api/path?fromMovieId=603&toMovieId=604")
        .add_header(header::AUTHORIZATION, bearer("wrong-key"))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn test_auth_missing_header_rejected() {
    let server = create_auth_test_server("correct-key");

    server.post("/works/603").await.assert_status_unauthorized();
}

#[tokio::test]
async fn test_auth_health_exempt() {
    let server = create_auth_test_server("correct-key");

    server.get("/health").await.assert_status_ok();
}

// =============================================================================
// RATE LIMITING
// =============================================================================

#[tokio::test]
async fn test_rate_limit_rejects_burst() {
    let security = SecurityConfig {
        rate_limit: 1,
        ..SecurityConfig::default()
    };
    let server = TestServer::new(create_router(state_with(security))).unwrap();

    server.get("/health").await.assert_status_ok();
    server
        .get("/health")
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}
