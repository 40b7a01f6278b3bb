//! API Handlers
//!
//! HTTP request handlers for each image cache endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, RawQuery, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

use crate::blobs::BlobRegistry;
use crate::cache::{CacheStore, SharedCache};
use crate::config::Config;
use crate::edge::{spawn_edge_controller, CacheStorage, EdgeCache, EdgeHandle, EdgeStats};
use crate::error::{CacheError, Result};
use crate::fetch::{FetchedResource, Fetcher};
use crate::integrity::{
    repair_corrupted_blobs, validate_cache_integrity, IntegrityReport, RepairReport,
};
use crate::models::{
    ClearResponse, HealthResponse, PreloadRequest, PreloadResponse, ResolveRequest,
    ResolveResponse, StatsResponse, TeardownResponse,
};
use crate::preload::{BatchOptions, BatchPreloader, ImagePreloader, ItemFields};

const EDGE_SOURCE_HEADER: &str = "x-edge-cache";

/// Application state shared across all handlers.
///
/// The cache store, engine and blob registry are process-wide; each listing
/// gets its own batch preloader on first use.
#[derive(Clone)]
pub struct AppState {
    pub cache: SharedCache,
    pub preloader: ImagePreloader,
    pub blobs: BlobRegistry,
    pub edge: Arc<EdgeCache>,
    /// Channel to the edge cache controller
    pub edge_handle: EdgeHandle,
    /// Batch preloaders by listing id. An entry lives until its listing is
    /// torn down with `DELETE /listings/:id`; callers that never tear down
    /// keep one small preloader per id they have used.
    pub listings: Arc<RwLock<HashMap<String, BatchPreloader>>>,
    pub batch_options: BatchOptions,
    pub fields: ItemFields,
    /// Delay before a scheduled listing preload starts
    pub start_delay: Duration,
    pub debug_endpoints: bool,
}

impl AppState {
    /// Creates a new AppState around an existing engine and edge cache.
    ///
    /// Spawns the edge cache controller; its task ends once every clone of
    /// the state is dropped.
    pub fn new(
        preloader: ImagePreloader,
        blobs: BlobRegistry,
        edge: Arc<EdgeCache>,
    ) -> (Self, JoinHandle<()>) {
        let (edge_handle, controller) = spawn_edge_controller(edge.clone());
        let state = Self {
            cache: preloader.cache().clone(),
            preloader,
            blobs,
            edge,
            edge_handle,
            listings: Arc::new(RwLock::new(HashMap::new())),
            batch_options: BatchOptions::default(),
            fields: ItemFields::default(),
            start_delay: Duration::ZERO,
            debug_endpoints: false,
        };
        (state, controller)
    }

    /// Creates a new AppState from configuration.
    pub fn from_config(config: &Config, fetcher: Arc<dyn Fetcher>) -> (Self, JoinHandle<()>) {
        let blobs = BlobRegistry::new();
        let cache = CacheStore::shared(config.max_cache_size);
        let mut preloader = ImagePreloader::new(cache, fetcher.clone());
        if config.keep_local_copies {
            preloader = preloader.with_local_copies(blobs.clone());
        }
        let edge = EdgeCache::new(
            CacheStorage::new(&config.edge_cache_dir),
            fetcher,
            config.image_origin.clone(),
            config.edge_cache_version.clone(),
        );

        let (mut state, controller) = Self::new(preloader, blobs, Arc::new(edge));
        state.batch_options = BatchOptions {
            batch_size: config.batch_size,
            delay_between_batches: config.batch_delay(),
            ..BatchOptions::default()
        };
        state.start_delay = config.start_delay();
        state.debug_endpoints = config.debug_endpoints;
        (state, controller)
    }

    /// Returns the listing's preloader, creating it on first use.
    async fn listing(&self, id: &str) -> BatchPreloader {
        if let Some(existing) = self.listings.read().await.get(id) {
            return existing.clone();
        }
        self.listings
            .write()
            .await
            .entry(id.to_string())
            .or_insert_with(|| {
                BatchPreloader::new(
                    self.preloader.clone(),
                    self.fields.clone(),
                    self.batch_options.clone(),
                )
            })
            .clone()
    }
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for POST /resolve
///
/// Never fails on a load error: the source URL comes back as `resolved`.
pub async fn resolve_handler(
    State(state): State<AppState>,
    Json(req): Json<ResolveRequest>,
) -> Result<Json<ResolveResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let resolved = state
        .preloader
        .resolve(req.url.as_deref(), &req.options())
        .await;

    Ok(Json(ResolveResponse::new(req.url, resolved)))
}

/// Handler for POST /listings/:id/preload
///
/// Schedules the listing's preload (202) or, with `wait`, runs it and
/// reports the outcome (200).
pub async fn preload_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<PreloadRequest>,
) -> (StatusCode, Json<PreloadResponse>) {
    let preloader = state.listing(&id).await;

    if req.wait {
        let outcome = preloader.preload(&req.items).await;
        return (StatusCode::OK, Json(PreloadResponse::completed(id, outcome)));
    }

    preloader.schedule(req.items, state.start_delay).await;
    let delay_ms = state.start_delay.as_millis() as u64;
    (
        StatusCode::ACCEPTED,
        Json(PreloadResponse::scheduled(id, delay_ms)),
    )
}

/// Handler for DELETE /listings/:id
///
/// Cancels the listing's scheduled work and forgets its processed markers.
pub async fn teardown_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<TeardownResponse> {
    let removed = state.listings.write().await.remove(&id);
    if let Some(preloader) = &removed {
        preloader.teardown().await;
        info!(listing = %id, "Listing preloader torn down");
    }

    Json(TeardownResponse {
        listing: id,
        removed: removed.is_some(),
    })
}

/// Handler for GET /blobs/:id
pub async fn blob_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response> {
    let blob = state
        .blobs
        .get_by_id(&id)
        .await
        .ok_or_else(|| CacheError::NotFound(format!("blob '{id}'")))?;

    Ok(resource_response(blob, Vec::new()))
}

/// Handler for GET /edge/*path
///
/// The `x-edge-cache` header says whether the answer came from the cache,
/// the network or the placeholder. The query string is part of the
/// request, so `?w=100` and `?w=800` are separate entries.
pub async fn edge_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Result<Response> {
    let accept = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok());
    let request = match query.filter(|q| !q.is_empty()) {
        Some(query) => format!("/{path}?{query}"),
        None => format!("/{path}"),
    };
    let response = state.edge.handle(&request, accept).await?;

    Ok(resource_response(
        response.resource,
        vec![(EDGE_SOURCE_HEADER, response.source.as_str())],
    ))
}

/// Handler for GET /edge-cache/stats
pub async fn edge_stats_handler(State(state): State<AppState>) -> Result<Json<EdgeStats>> {
    Ok(Json(state.edge_handle.stats().await?))
}

/// Handler for POST /edge-cache/clear
///
/// Queues the clear and returns without waiting for it.
pub async fn edge_clear_handler(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<ClearResponse>)> {
    state.edge_handle.clear_image_cache().await?;
    Ok((StatusCode::ACCEPTED, Json(ClearResponse::queued())))
}

/// Handler for GET /debug/cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(state.preloader.stats().await.into())
}

/// Handler for POST /debug/cache/clear
pub async fn cache_clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    Json(ClearResponse::cleared(state.preloader.clear().await))
}

/// Handler for GET /debug/cache/integrity
pub async fn integrity_handler(State(state): State<AppState>) -> Json<IntegrityReport> {
    Json(validate_cache_integrity(&state.cache, &state.blobs).await)
}

/// Handler for POST /debug/cache/repair
pub async fn repair_handler(State(state): State<AppState>) -> Json<RepairReport> {
    Json(repair_corrupted_blobs(&state.preloader, &state.blobs).await)
}

fn resource_response(
    resource: FetchedResource,
    extra: Vec<(&'static str, &'static str)>,
) -> Response {
    let status = StatusCode::from_u16(resource.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let content_type = resource
        .content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());

    let mut response = (
        status,
        [(header::CONTENT_TYPE, content_type)],
        resource.body,
    )
        .into_response();
    for (name, value) in extra {
        response
            .headers_mut()
            .insert(name, header::HeaderValue::from_static(value));
    }
    response
}
