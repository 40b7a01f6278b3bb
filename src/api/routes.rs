//! API Routes
//!
//! Configures the Axum router with all image cache endpoints.

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    blob_handler, cache_clear_handler, cache_stats_handler, edge_clear_handler, edge_handler,
    edge_stats_handler, health_handler, integrity_handler, preload_handler, repair_handler,
    resolve_handler, teardown_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `GET /health` - Health check endpoint
/// - `POST /resolve` - Resolve one image URL through the memory cache
/// - `POST /listings/:id/preload` - Preload a listing's images
/// - `DELETE /listings/:id` - Tear down a listing's preloader
/// - `GET /blobs/:id` - Serve a locally held image copy
/// - `GET /edge/*path` - Fetch through the edge cache
/// - `GET /edge-cache/stats`, `POST /edge-cache/clear` - Edge cache messages
///
/// The `/debug/cache/*` routes are mounted only when the state enables them.
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let mut router = Router::new()
        .route("/health", get(health_handler))
        .route("/resolve", post(resolve_handler))
        .route("/listings/:id/preload", post(preload_handler))
        .route("/listings/:id", delete(teardown_handler))
        .route("/blobs/:id", get(blob_handler))
        .route("/edge/*path", get(edge_handler))
        .route("/edge-cache/stats", get(edge_stats_handler))
        .route("/edge-cache/clear", post(edge_clear_handler));

    if state.debug_endpoints {
        router = router.merge(debug_routes());
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn debug_routes() -> Router<AppState> {
    Router::new()
        .route("/debug/cache/stats", get(cache_stats_handler))
        .route("/debug/cache/clear", post(cache_clear_handler))
        .route("/debug/cache/integrity", get(integrity_handler))
        .route("/debug/cache/repair", post(repair_handler))
}
