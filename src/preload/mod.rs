//! Preload Module
//!
//! Single-image resolution and batched preloading of item collections.

mod batch;
mod engine;
mod items;

pub use batch::{BatchOptions, BatchOutcome, BatchPreloader, DEFAULT_BATCH_DELAY, DEFAULT_BATCH_SIZE};
pub use engine::ImagePreloader;
pub use items::{FieldPath, ItemFields};
