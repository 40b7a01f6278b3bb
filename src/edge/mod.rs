//! Edge Cache Module
//!
//! Persistent, request-keyed cache in front of the image origin. It has its
//! own lifecycle, independent of the in-memory cache store.

mod channel;
mod storage;
mod worker;

pub use channel::{spawn_edge_controller, EdgeHandle, EdgeMessage};
pub use storage::{CacheGeneration, CacheStorage};
pub use worker::{
    builtin_placeholder, is_image_request, EdgeCache, EdgeResponse, EdgeSource, EdgeStats,
    DEFAULT_EDGE_VERSION, PLACEHOLDER_PATH,
};
