//! Wire-format tests for the API request/response types.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;
use costar::api::{
    ErrorResponse, ExportResponse, HealthResponse, PathParams, StatusResponse, status_for,
};
use costar_core::{BackendKind, CostarError, GraphCounts};

#[test]
fn test_health_response_default() {
    let health = HealthResponse::default();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[test]
fn test_status_response_serialization() {
    let status = StatusResponse::new(
        BackendKind::Redb,
        GraphCounts {
            works: 3,
            contributors: 5,
            edges: 7,
        },
    );
    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(
        json,
        serde_json::json!({"backend": "redb", "works": 3, "contributors": 5, "edges": 7})
    );
}

#[test]
fn test_path_params_use_camel_case_names() {
    let params: PathParams =
        serde_json::from_value(serde_json::json!({"fromMovieId": "603", "toMovieId": "13"}))
            .unwrap();
    assert_eq!(params.from_movie_id.as_deref(), Some("603"));
    assert_eq!(params.to_movie_id.as_deref(), Some("13"));

    let empty: PathParams = serde_json::from_value(serde_json::json!({})).unwrap();
    assert!(empty.from_movie_id.is_none());
    assert!(empty.to_movie_id.is_none());
}

#[test]
fn test_error_response_serialization() {
    let json = serde_json::to_string(&ErrorResponse::new("boom")).unwrap();
    assert_eq!(json, r#"{"error":"boom"}"#);
}

#[test]
fn test_export_response_success() {
    let counts = GraphCounts {
        works: 1,
        contributors: 2,
        edges: 2,
    };
    let response = ExportResponse::success(b"CSTR", 42, counts);
    assert!(response.success);
    assert_eq!(response.data.as_deref(), Some("Q1NUUg=="));
    assert_eq!(response.checksum, Some(42));
    assert_eq!(response.edges, 2);
    assert!(response.error.is_none());
}

#[test]
fn test_export_response_error() {
    let response = ExportResponse::error("no store");
    assert!(!response.success);
    assert!(response.data.is_none());
    assert_eq!(response.error.as_deref(), Some("no store"));
}

#[test]
fn test_status_codes_per_error_kind() {
    let cases = [
        (CostarError::Validation("x".into()), StatusCode::BAD_REQUEST),
        (CostarError::WorkNotFound("1".into()), StatusCode::NOT_FOUND),
        (
            CostarError::NoPath {
                from: "1".into(),
                to: "2".into(),
            },
            StatusCode::NOT_FOUND,
        ),
        (CostarError::UpstreamFetch("503".into()), StatusCode::BAD_GATEWAY),
        (
            CostarError::InternalStore("disk".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
        (
            CostarError::Serialization("bad".into()),
            StatusCode::INTERNAL_SERVER_ERROR,
        ),
    ];
    for (error, expected) in cases {
        assert_eq!(status_for(&error), expected, "{error}");
    }
}
