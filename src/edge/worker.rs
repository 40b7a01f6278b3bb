//! Edge Cache Worker
//!
//! Intercepts image requests on their way to the origin. Hits come from the
//! image generation on disk, misses are fetched and stored, and network
//! failures fall back to the placeholder asset.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::storage::{CacheGeneration, CacheStorage};
use crate::error::Result;
use crate::fetch::{FetchedResource, Fetcher};

pub const PLACEHOLDER_PATH: &str = "/placeholder-image.svg";
pub const DEFAULT_EDGE_VERSION: &str = "v1";

const STATIC_PREFIX: &str = "app-static";
const IMAGES_PREFIX: &str = "app-images";

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "bmp", "ico",
];

const PLACEHOLDER_SVG: &str = concat!(
    r##"<svg xmlns="http://www.w3.org/2000/svg" width="300" height="200" viewBox="0 0 300 200">"##,
    r##"<rect width="300" height="200" fill="#e5e7eb"/>"##,
    r##"<text x="150" y="105" font-family="sans-serif" font-size="14" fill="#9ca3af" "##,
    r##"text-anchor="middle">Image unavailable</text></svg>"##,
);

/// The placeholder shipped with the binary.
pub fn builtin_placeholder() -> FetchedResource {
    FetchedResource::new(200, Some("image/svg+xml"), PLACEHOLDER_SVG)
}

/// True for paths with an image extension or an `Accept` header whose
/// preferred media range is an image type.
pub fn is_image_request(path: &str, accept: Option<&str>) -> bool {
    let file = path.split(['?', '#']).next().unwrap_or(path);
    let by_extension = file
        .rsplit_once('.')
        .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    let by_accept = accept
        .and_then(|accept| accept.split(',').next())
        .map(|preferred| preferred.trim().to_ascii_lowercase().starts_with("image/"))
        .unwrap_or(false);

    by_extension || by_accept
}

// == Edge Response ==
/// Where a handled response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeSource {
    Cache,
    Network,
    Placeholder,
}

impl EdgeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeSource::Cache => "cache",
            EdgeSource::Network => "network",
            EdgeSource::Placeholder => "placeholder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeResponse {
    pub resource: FetchedResource,
    pub source: EdgeSource,
}

// == Edge Stats ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeStats {
    pub static_cache: String,
    pub image_cache: String,
    pub static_entries: usize,
    pub image_entries: usize,
    /// Every generation currently on disk
    pub generations: Vec<String>,
}

// == Edge Cache ==
pub struct EdgeCache {
    storage: CacheStorage,
    fetcher: Arc<dyn Fetcher>,
    origin: String,
    version: String,
    static_assets: Vec<String>,
}

impl EdgeCache {
    pub fn new(
        storage: CacheStorage,
        fetcher: Arc<dyn Fetcher>,
        origin: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            fetcher,
            origin: origin.into().trim_end_matches('/').to_string(),
            version: version.into(),
            static_assets: vec![PLACEHOLDER_PATH.to_string()],
        }
    }

    /// Replaces the asset list seeded at install.
    pub fn with_static_assets(mut self, assets: Vec<String>) -> Self {
        self.static_assets = assets;
        self
    }

    pub fn static_cache_name(&self) -> String {
        format!("{STATIC_PREFIX}-{}", self.version)
    }

    pub fn image_cache_name(&self) -> String {
        format!("{IMAGES_PREFIX}-{}", self.version)
    }

    /// Seeds the static generation from the origin.
    ///
    /// Returns how many assets were stored. The placeholder is always
    /// present afterwards, built-in if the origin could not supply it.
    pub async fn install(&self) -> Result<usize> {
        let static_cache = self.storage.open(&self.static_cache_name()).await?;
        let mut stored = 0;

        for asset in &self.static_assets {
            let fetched = match self.fetcher.fetch(&self.origin_url(asset)).await {
                Ok(resource) if resource.status == 200 => Some(resource),
                Ok(resource) => {
                    warn!(asset = %asset, status = resource.status, "Static asset not available");
                    None
                }
                Err(err) => {
                    warn!(asset = %asset, error = %err, "Static asset fetch failed");
                    None
                }
            };

            let resource = match fetched {
                Some(resource) => resource,
                None if asset == PLACEHOLDER_PATH => builtin_placeholder(),
                None => continue,
            };
            static_cache.put(asset, &resource).await?;
            stored += 1;
        }

        info!(cache = %static_cache.name(), stored, "Edge cache installed");
        Ok(stored)
    }

    /// Deletes every generation that is not current; returns their names.
    pub async fn activate(&self) -> Result<Vec<String>> {
        let current = [self.static_cache_name(), self.image_cache_name()];
        let mut deleted = Vec::new();

        for name in self.storage.keys().await? {
            if current.contains(&name) {
                continue;
            }
            if self.storage.delete(&name).await? {
                deleted.push(name);
            }
        }

        if !deleted.is_empty() {
            info!(deleted = ?deleted, "Stale edge cache generations removed");
        }
        Ok(deleted)
    }

    /// Answers a request for `path` as the intercepting layer.
    pub async fn handle(&self, path: &str, accept: Option<&str>) -> Result<EdgeResponse> {
        if is_image_request(path, accept) {
            self.handle_image(path).await
        } else {
            self.handle_other(path).await
        }
    }

    /// Storage failures never fail the request; they degrade to a miss
    /// or to an unstored network response.
    async fn handle_image(&self, path: &str) -> Result<EdgeResponse> {
        let images = match self.images().await {
            Ok(images) => Some(images),
            Err(err) => {
                warn!(path = %path, error = %err, "Image cache unavailable");
                None
            }
        };
        if let Some(images) = &images {
            match images.match_request(path).await {
                Ok(Some(resource)) => {
                    debug!(path = %path, "Edge cache hit");
                    return Ok(EdgeResponse {
                        resource,
                        source: EdgeSource::Cache,
                    });
                }
                Ok(None) => {}
                Err(err) => warn!(path = %path, error = %err, "Edge cache read failed"),
            }
        }

        match self.fetcher.fetch(&self.origin_url(path)).await {
            Ok(resource) => {
                if let (200, Some(images)) = (resource.status, &images) {
                    match images.put(path, &resource).await {
                        Ok(()) => debug!(path = %path, "Edge cache stored"),
                        Err(err) => warn!(path = %path, error = %err, "Edge cache write failed"),
                    }
                }
                Ok(EdgeResponse {
                    resource,
                    source: EdgeSource::Network,
                })
            }
            Err(err) => {
                warn!(path = %path, error = %err, "Image fetch failed, serving placeholder");
                Ok(EdgeResponse {
                    resource: self.placeholder().await?,
                    source: EdgeSource::Placeholder,
                })
            }
        }
    }

    async fn handle_other(&self, path: &str) -> Result<EdgeResponse> {
        let static_cache = self.storage.open(&self.static_cache_name()).await?;
        if let Some(resource) = static_cache.match_request(path).await? {
            return Ok(EdgeResponse {
                resource,
                source: EdgeSource::Cache,
            });
        }

        let resource = self.fetcher.fetch(&self.origin_url(path)).await?;
        Ok(EdgeResponse {
            resource,
            source: EdgeSource::Network,
        })
    }

    async fn placeholder(&self) -> Result<FetchedResource> {
        let static_cache = self.storage.open(&self.static_cache_name()).await?;
        Ok(static_cache
            .match_request(PLACEHOLDER_PATH)
            .await?
            .unwrap_or_else(builtin_placeholder))
    }

    pub async fn stats(&self) -> Result<EdgeStats> {
        let static_cache = self.storage.open(&self.static_cache_name()).await?;
        let images = self.images().await?;
        Ok(EdgeStats {
            static_cache: static_cache.name().to_string(),
            image_cache: images.name().to_string(),
            static_entries: static_cache.len().await?,
            image_entries: images.len().await?,
            generations: self.storage.keys().await?,
        })
    }

    /// Empties the image generation; returns how many entries were dropped.
    pub async fn clear_image_cache(&self) -> Result<usize> {
        let cleared = self.images().await?.clear().await?;
        info!(cleared, "Edge image cache cleared");
        Ok(cleared)
    }

    async fn images(&self) -> Result<CacheGeneration> {
        self.storage.open(&self.image_cache_name()).await
    }

    fn origin_url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.origin, path)
        } else {
            format!("{}/{}", self.origin, path)
        }
    }
}
