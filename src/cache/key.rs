//! Cache Key Module
//!
//! Derives the identity of a cached image from its source URL and sizing options.

use std::fmt;

use serde::{Deserialize, Serialize};

// == Defaults ==
/// Width used when a request does not specify one
pub const DEFAULT_WIDTH: u32 = 300;
/// Height used when a request does not specify one
pub const DEFAULT_HEIGHT: u32 = 200;
/// Quality used when a request does not specify one
pub const DEFAULT_QUALITY: u8 = 80;

// == Image Options ==
/// Optional sizing and quality hints for an image request.
///
/// Each field defaults independently when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<u8>,
}

impl ImageOptions {
    /// Creates options with every field set.
    pub fn sized(width: u32, height: u32, quality: u8) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            quality: Some(quality),
        }
    }

    /// Returns the options with all defaults applied.
    pub fn resolved(&self) -> ImageOptions {
        Self::sized(
            self.width.unwrap_or(DEFAULT_WIDTH),
            self.height.unwrap_or(DEFAULT_HEIGHT),
            self.quality.unwrap_or(DEFAULT_QUALITY),
        )
    }
}

// == Cache Key ==
/// Identity of a cached image: source URL plus resolved sizing options.
///
/// The rendered form is `"{url}_{width}x{height}_q{quality}"`. The source URL
/// is kept as its own field, so it never has to be parsed back out of the
/// rendered string (URLs may legitimately contain `_`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source_url: String,
    width: u32,
    height: u32,
    quality: u8,
}

impl CacheKey {
    // == Constructor ==
    /// Derives a key from a source URL and request options.
    pub fn new(source_url: impl Into<String>, options: &ImageOptions) -> Self {
        let resolved = options.resolved();
        Self {
            source_url: source_url.into(),
            width: resolved.width.unwrap_or(DEFAULT_WIDTH),
            height: resolved.height.unwrap_or(DEFAULT_HEIGHT),
            quality: resolved.quality.unwrap_or(DEFAULT_QUALITY),
        }
    }

    /// The URL this key was derived from.
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// The fully resolved options this key was derived from.
    pub fn options(&self) -> ImageOptions {
        ImageOptions::sized(self.width, self.height, self.quality)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}x{}_q{}",
            self.source_url, self.width, self.height, self.quality
        )
    }
}
