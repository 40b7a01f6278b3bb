//! Menu Image Cache - image caching for menu listings
//!
//! A bounded FIFO memory cache with de-duplicated, batched preloading, an
//! integrity checker for locally held copies, and a persistent edge cache in
//! front of the image origin.

pub mod api;
pub mod blobs;
pub mod cache;
pub mod config;
pub mod edge;
pub mod error;
pub mod fetch;
pub mod integrity;
pub mod models;
pub mod preload;
pub mod tasks;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{CacheError, Result};
pub use preload::{BatchPreloader, ImagePreloader};
