//! Station - static file server with client-side caching headers
//!
//! Serves a directory behind the static file and cache header middlewares,
//! falling back to a small router with a health endpoint.

use std::net::SocketAddr;

use anyhow::Context;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use station::api::create_app;
use station::Config;

/// Main entry point for the Station server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Wrap the router in the static file and cache header middlewares
/// 4. Start HTTP server on configured port
/// 5. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber with env filter
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "station=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Station");

    // Load configuration from environment variables
    let config = Config::from_env();
    info!(
        "Configuration loaded: static_root={}, port={}, cache_max_age={}s, list_dir={}",
        config.static_root.display(),
        config.server_port,
        config.cache_max_age,
        config.list_dir
    );

    if !config.static_root.is_dir() {
        warn!(
            "Static root {} is not a directory, every request will fall through",
            config.static_root.display()
        );
    }

    let app = create_app(&config);

    // Bind to configured port
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    // Start server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Signal that ended the serve loop.
#[derive(Debug, Clone, Copy)]
enum StopSignal {
    Interrupt,
    Terminate,
}

/// Resolves once the process is asked to stop; in-flight requests then drain.
async fn shutdown_signal() {
    let stop = tokio::select! {
        stop = interrupt() => stop,
        stop = terminate() => stop,
    };
    info!(signal = ?stop, "Stop requested, draining open connections");
}

async fn interrupt() -> StopSignal {
    if let Err(e) = signal::ctrl_c().await {
        warn!("Ctrl+C cannot stop the server: {}", e);
        std::future::pending::<()>().await;
    }
    StopSignal::Interrupt
}

#[cfg(unix)]
async fn terminate() -> StopSignal {
    use tokio::signal::unix::SignalKind;

    match signal::unix::signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("SIGTERM cannot stop the server: {}", e);
            std::future::pending::<()>().await;
        }
    }
    StopSignal::Terminate
}

#[cfg(not(unix))]
async fn terminate() -> StopSignal {
    std::future::pending().await
}
