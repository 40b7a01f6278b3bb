//! Request DTOs for the image cache API
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;
use serde_json::Value;

use crate::cache::ImageOptions;

/// Request body for `POST /resolve`
///
/// A missing or empty `url` is accepted and resolves to nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolveRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub quality: Option<u8>,
}

impl ResolveRequest {
    pub fn options(&self) -> ImageOptions {
        ImageOptions {
            width: self.width,
            height: self.height,
            quality: self.quality,
        }
    }

    /// Validates the sizing options
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.width == Some(0) || self.height == Some(0) {
            return Some("Width and height must be positive".to_string());
        }
        if matches!(self.quality, Some(q) if q == 0 || q > 100) {
            return Some("Quality must be between 1 and 100".to_string());
        }
        None
    }
}

/// Request body for `POST /listings/{id}/preload`
#[derive(Debug, Clone, Deserialize)]
pub struct PreloadRequest {
    /// Menu items, in display order
    pub items: Vec<Value>,
    /// Run now and report instead of scheduling
    #[serde(default)]
    pub wait: bool,
}
