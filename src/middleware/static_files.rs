//! Static-File Middleware
//!
//! Serves files from a directory before falling through to the wrapped
//! service. Useful when assets such as `favicon.ico` or stylesheets should be
//! answered first across an entire router.
//!
//! # Request Flow
//! 1. Join the request path onto the root directory
//! 2. Stat the result; any failure calls the wrapped service
//! 3. Directories call the wrapped service unless listings are enabled
//! 4. Everything else is served: files through `ServeFile`, directories as
//!    their `index.html` or a generated listing

use std::convert::Infallible;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::Request,
    handler::{Handler, HandlerWithoutStateExt},
    http::{header, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use percent_encoding::percent_decode_str;
use tower::{util::BoxCloneService, Layer, Service, ServiceExt};
use tower_http::services::ServeFile;
use tracing::{debug, error, warn};

use super::http_date::format_system_time;
use super::listing::{read_entries, render_listing};
use super::resolve::{contains_dot_dot, resolve, ResolvedFile};
use crate::error::{StationError, NOT_FOUND_BODY};

/// File served in place of a listing when present in a directory.
pub const INDEX_FILE: &str = "index.html";

/// Type-erased handler used by [`serve`] on a miss.
pub type NotFoundService = BoxCloneService<Request, Response, Infallible>;

// == Static Options ==
/// Options for the static file middleware and [`serve`].
#[derive(Clone, Default)]
pub struct StaticOptions {
    /// Serve directory listings instead of passing directories through.
    pub list_dir: bool,
    /// Called by [`serve`] on a miss. Defaults to [`not_found`].
    pub not_found: Option<NotFoundService>,
}

impl StaticOptions {
    /// Creates options with listings disabled and the default 404 handler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns directory listings on or off.
    pub fn list_dir(mut self, list_dir: bool) -> Self {
        self.list_dir = list_dir;
        self
    }

    /// Uses an axum handler for misses in [`serve`].
    pub fn not_found_handler<H, T>(self, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.not_found_service(handler.into_service())
    }

    /// Uses a service for misses in [`serve`].
    pub fn not_found_service<S>(mut self, service: S) -> Self
    where
        S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
        S::Future: Send + 'static,
    {
        self.not_found = Some(BoxCloneService::new(service));
        self
    }
}

impl std::fmt::Debug for StaticOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticOptions")
            .field("list_dir", &self.list_dir)
            .field("not_found", &self.not_found.is_some())
            .finish()
    }
}

/// Immutable per-layer configuration shared by every request.
#[derive(Debug)]
struct StaticConfig {
    root: PathBuf,
    list_dir: bool,
}

// == Layer ==
/// Tower layer that wraps a service in [`Static`].
#[derive(Debug, Clone)]
pub struct StaticLayer {
    config: Arc<StaticConfig>,
}

impl StaticLayer {
    /// Creates a layer serving files below `root`.
    pub fn new(root: impl Into<PathBuf>, opts: StaticOptions) -> Self {
        let root = root.into();
        debug!(
            root = %root.display(),
            list_dir = opts.list_dir,
            "Static file middleware configured"
        );
        Self {
            config: Arc::new(StaticConfig {
                root,
                list_dir: opts.list_dir,
            }),
        }
    }

    /// The directory files are served from.
    pub fn root(&self) -> &Path {
        &self.config.root
    }
}

impl<S> Layer<S> for StaticLayer {
    type Service = Static<S>;

    fn layer(&self, inner: S) -> Self::Service {
        Static {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// Provides middleware that serves static assets from `root`, calling the
/// wrapped service when no file matches.
pub fn static_files(root: impl Into<PathBuf>, opts: StaticOptions) -> StaticLayer {
    StaticLayer::new(root, opts)
}

/// Builds a standalone handler serving files from `root`.
///
/// Misses go to `opts.not_found`, or to [`not_found`] when none is set.
pub fn serve(root: impl Into<PathBuf>, mut opts: StaticOptions) -> Static<NotFoundService> {
    let fallback = opts
        .not_found
        .take()
        .unwrap_or_else(|| BoxCloneService::new(not_found.into_service()));
    StaticLayer::new(root, opts).layer(fallback)
}

/// Generic 404 responder.
pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        NOT_FOUND_BODY,
    )
        .into_response()
}

// == Service ==
/// Service that serves files below a root directory and calls `S` otherwise.
#[derive(Debug, Clone)]
pub struct Static<S> {
    inner: S,
    config: Arc<StaticConfig>,
}

impl<S> Service<Request> for Static<S>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request) -> Self::Future {
        // Call the instance that was driven to readiness, keep a fresh clone.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);

        Box::pin(async move { dispatch(&config, req, inner).await })
    }
}

async fn dispatch<S>(
    config: &StaticConfig,
    req: Request,
    mut next: S,
) -> Result<Response, Infallible>
where
    S: Service<Request, Response = Response, Error = Infallible>,
{
    let request_path = req.uri().path().to_owned();

    let resolved = match resolve(&config.root, &request_path).await {
        Ok(resolved) => resolved,
        Err(err) => {
            if err.is_not_found() {
                debug!(path = %request_path, "No static file, passing through");
            } else {
                warn!(
                    path = %request_path,
                    error = %err,
                    "Static lookup failed, passing through"
                );
            }
            return next.call(req).await;
        }
    };

    if resolved.is_dir && !config.list_dir {
        debug!(path = %request_path, "Directory listing disabled, passing through");
        return next.call(req).await;
    }

    Ok(serve_resolved(resolved, req).await)
}

/// Serves a file or directory that exists on disk.
async fn serve_resolved(resolved: ResolvedFile, req: Request) -> Response {
    if contains_dot_dot(&percent_decode_str(req.uri().path()).decode_utf8_lossy()) {
        return StationError::InvalidPath(req.uri().path().to_owned()).into_response();
    }

    if !resolved.is_dir {
        debug!(file = %resolved.path.display(), "Serving static file");
        return serve_file(&resolved.path, req).await;
    }

    let index = resolved.path.join(INDEX_FILE);
    if tokio::fs::metadata(&index)
        .await
        .is_ok_and(|metadata| metadata.is_file())
    {
        debug!(file = %index.display(), "Serving directory index");
        return serve_file(&index, req).await;
    }

    serve_listing(&resolved, req.uri().path()).await
}

async fn serve_file(path: &Path, req: Request) -> Response {
    // ServeFile sets Content-Type and Last-Modified and answers conditional
    // and range requests.
    match ServeFile::new(path).oneshot(req).await {
        Ok(response) => response.map(Body::new),
        Err(never) => match never {},
    }
}

async fn serve_listing(resolved: &ResolvedFile, request_path: &str) -> Response {
    let entries = match read_entries(&resolved.path).await {
        Ok(entries) => entries,
        Err(err) => {
            error!(dir = %resolved.path.display(), error = %err, "Failed to read directory");
            return err.into_response();
        }
    };

    debug!(
        dir = %resolved.path.display(),
        entries = entries.len(),
        "Serving directory listing"
    );

    let mut response = Html(render_listing(request_path, &entries)).into_response();
    if let Some(modified) = resolved.modified {
        if let Ok(value) = HeaderValue::from_str(&format_system_time(modified)) {
            response.headers_mut().insert(header::LAST_MODIFIED, value);
        }
    }
    response
}
