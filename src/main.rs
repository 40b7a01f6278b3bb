//! Menu Image Cache - HTTP service entry point
//!
//! Serves the memory cache, listing preloads and the edge cache over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use menu_image_cache::fetch::HttpFetcher;
use menu_image_cache::{create_router, AppState, Config};

/// Main entry point for the image cache service.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Build the shared state and start the edge cache controller
/// 4. Install and activate the edge cache
/// 5. Start HTTP server on configured port
/// 6. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "menu_image_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Menu Image Cache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_cache_size={}, batch_size={}, batch_delay={}ms, port={}, origin={}, edge_version={}",
        config.max_cache_size,
        config.batch_size,
        config.batch_delay_ms,
        config.server_port,
        config.image_origin,
        config.edge_cache_version
    );

    let fetcher = HttpFetcher::new(config.fetch_timeout()).context("building HTTP client")?;
    let (state, controller) = AppState::from_config(&config, Arc::new(fetcher));

    state
        .edge
        .install()
        .await
        .context("installing edge cache")?;
    state
        .edge
        .activate()
        .await
        .context("activating edge cache")?;

    if state.debug_endpoints {
        warn!("Debug endpoints enabled under /debug/cache");
    }

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(controller))
        .await
        .context("serving HTTP")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, stops the edge cache controller.
async fn shutdown_signal(controller: JoinHandle<()>) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    controller.abort();
    warn!("Edge cache controller stopped");
}
