//! Error types for the static file middleware
//!
//! Provides unified error handling using thiserror. None of these errors
//! escape the middleware as service errors: a failed lookup turns into a
//! delegation to the wrapped handler, and the rest become plain responses.

use std::io;
use std::path::PathBuf;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Body of the generic 404 response.
pub const NOT_FOUND_BODY: &str = "404 page not found\n";

// == Station Error Enum ==
/// Unified error type for resolving and serving files.
#[derive(Error, Debug)]
pub enum StationError {
    /// Nothing exists at the resolved path
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Request path could not be decoded or contains a `..` segment
    #[error("Invalid request path: {0}")]
    InvalidPath(String),

    /// Any other filesystem failure (permissions, broken links, ...)
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StationError {
    /// Classifies an I/O error raised while touching `path`.
    pub fn from_io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            StationError::NotFound(path)
        } else {
            StationError::Io { path, source }
        }
    }

    /// Returns true for the "nothing here" case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StationError::NotFound(_))
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for StationError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            StationError::NotFound(_) => (StatusCode::NOT_FOUND, NOT_FOUND_BODY),
            StationError::InvalidPath(_) => (StatusCode::BAD_REQUEST, "invalid URL path\n"),
            StationError::Io { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error reading directory\n",
            ),
        };

        (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            message,
        )
            .into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for file resolution.
pub type Result<T> = std::result::Result<T, StationError>;
