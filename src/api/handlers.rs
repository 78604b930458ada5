//! API Handlers
//!
//! HTTP request handlers of the demo server.

use axum::{response::Response, Json};

use crate::middleware;
use crate::models::HealthResponse;

/// Handler for GET /health
///
/// Returns health status of the server.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Fallback for every path the router and the static root don't know.
pub async fn fallback_handler() -> Response {
    middleware::not_found().await
}
