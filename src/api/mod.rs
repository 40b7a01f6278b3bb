//! API Module
//!
//! HTTP handlers and routing for the image cache service.
//!
//! # Endpoints
//! - `GET /health` - Health check endpoint
//! - `POST /resolve` - Resolve an image through the memory cache
//! - `POST /listings/:id/preload`, `DELETE /listings/:id` - Listing preloads
//! - `GET /blobs/:id` - Local image copies
//! - `GET /edge/*path` - Edge cache intercepted fetch
//! - `GET /edge-cache/stats`, `POST /edge-cache/clear` - Edge cache control
//! - `/debug/cache/*` - Inspection routes, when enabled

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
