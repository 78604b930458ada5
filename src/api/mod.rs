//! API Module
//!
//! Router and handlers of the demo server, wrapped in both middlewares.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - anything else - a file below the static root, or 404

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{create_app, create_router};
