//! # costar HTTP API
//!
//! ## Endpoints
//!
//! - `GET /api/path?fromMovieId=..&toMovieId=..` - Shortest chain between two works
//! - `POST /works/{id}` - Ingest one work and its credits
//! - `GET /status` - Work, contributor and edge counts
//! - `GET /export` - Binary snapshot, base64 encoded
//! - `GET /health` - Health check
//!
//! ## Security
//!
//! - `cors_origins`: comma-separated allowed origins, or "*" (default: localhost only)
//! - `rate_limit`: requests per second (0 disables)
//! - `api_key`: if set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{ApiKey, api_key_auth_middleware, key_matches};
pub use handlers::{
    export_handler, health_handler, ingest_work_handler, path_handler, status_for,
    status_handler,
};
pub use middleware::{GlobalRateLimiter, create_rate_limiter};
pub use types::{ErrorResponse, ExportResponse, HealthResponse, PathParams, StatusResponse};

use crate::config::SecurityConfig;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post},
};
use costar_core::{CostarError, GraphHandle, PathQuery, UpsertEngine};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Request body ceiling. Every route takes its input from the URL.
const MAX_BODY_BYTES: usize = 64 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the path query (engine plus finder over one store)
/// and the security settings the router is built with.
#[derive(Debug, Clone)]
pub struct AppState {
    pub query: PathQuery,
    pub security: SecurityConfig,
}

impl AppState {
    /// State with default security (localhost CORS, default rate limit, no key).
    pub fn new(engine: UpsertEngine) -> Self {
        Self {
            query: PathQuery::new(engine),
            security: SecurityConfig::default(),
        }
    }

    #[must_use]
    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    pub fn graph(&self) -> &GraphHandle {
        self.query.engine().graph()
    }
}

// =============================================================================
// CORS
// =============================================================================

fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    match origins.map(str::trim) {
        Some("*") => {
            tracing::warn!("CORS: allowing ALL origins. This is insecure for production!");
            CorsLayer::permissive()
        }
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter_map(|s| match s.parse::<HeaderValue>() {
                    Ok(hv) => {
                        tracing::info!("CORS: allowing origin: {}", s);
                        Some(hv)
                    }
                    Err(e) => {
                        tracing::warn!("CORS: invalid origin '{}': {}", s, e);
                        None
                    }
                })
                .collect();

            if allowed.is_empty() {
                tracing::warn!("CORS: no valid origins configured, defaulting to localhost only");
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed)
                    .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => build_localhost_cors(),
    }
}

fn build_localhost_cors() -> CorsLayer {
    let origins = [
        "http://localhost:3000",
        "http://localhost:8080",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:8080",
    ]
    .into_iter()
    .filter_map(|o| o.parse::<HeaderValue>().ok())
    .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the router with auth, rate limiting, CORS and tracing layers.
pub fn create_router(state: AppState) -> Router {
    let security = state.security.clone();
    let cors = build_cors_layer(security.cors_origins.as_deref());

    let rate_limiter = create_rate_limiter(security.rate_limit);
    match &rate_limiter {
        Some(_) => tracing::info!(
            "Rate limiting enabled: {} requests/second",
            security.rate_limit
        ),
        None => tracing::info!("Rate limiting disabled"),
    }

    let api_key: Option<ApiKey> = security
        .api_key
        .as_deref()
        .filter(|k| !k.is_empty())
        .map(ApiKey::from);
    if api_key.is_some() {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set COSTAR_API_KEY to enable authentication."
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/api/path", get(handlers::path_handler))
        .route("/works/{id}", post(handlers::ingest_work_handler))
        .route("/export", get(handlers::export_handler));

    // Innermost: runs last on the request.
    if let Some(key) = api_key {
        router = router.layer(axum_middleware::from_fn_with_state(
            key,
            auth::api_key_auth_middleware,
        ));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

/// Serve until Ctrl+C, then persist a `file` backend.
pub async fn run_server(addr: &str, state: AppState) -> Result<(), CostarError> {
    let graph = state.graph().clone();
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CostarError::Io(format!("Bind failed: {}", e)))?;

    tracing::info!("costar HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CostarError::Io(format!("Server error: {}", e)))?;

    graph.save()
}
