//! API Routes
//!
//! Configures the Axum router of the demo server and wraps it in the
//! static file and cache header middlewares.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use super::handlers::{fallback_handler, health_handler};
use crate::config::Config;
use crate::middleware::{cache, static_files};

/// Creates the bare router.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - fallback - 404 for everything else
pub fn create_router() -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .fallback(fallback_handler)
}

/// Creates the full application: `Cache(Static(router))`.
///
/// # Middleware
/// - Static files: answers first from `config.static_root`
/// - Cache headers: applied to every response, files and routes alike
/// - Tracing: Logs all requests for debugging
pub fn create_app(config: &Config) -> Router {
    create_router()
        .layer(static_files(
            config.static_root.clone(),
            config.static_options(),
        ))
        .layer(cache(config.cache_options()))
        .layer(TraceLayer::new_for_http())
}
