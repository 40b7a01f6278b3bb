//! Preload Engine
//!
//! Resolves one image URL plus sizing options to a cached reference,
//! collapsing concurrent requests for the same key into one network load.

use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, warn};

use crate::blobs::BlobRegistry;
use crate::cache::{
    CacheEntry, CacheKey, CacheStats, CacheStore, Flight, ImageOptions, LoadSettled, PendingLoad,
    SharedCache,
};
use crate::fetch::{FetchedResource, Fetcher};

// == Image Preloader ==
/// Handle to the preload engine.
///
/// Cloning is cheap; clones share the same cache and fetcher.
#[derive(Clone)]
pub struct ImagePreloader {
    cache: SharedCache,
    fetcher: Arc<dyn Fetcher>,
    /// When set, successful loads are kept as local copies and the cache
    /// holds their `blob:` references instead of the source URL.
    local_copies: Option<BlobRegistry>,
}

impl ImagePreloader {
    pub fn new(cache: SharedCache, fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            cache,
            fetcher,
            local_copies: None,
        }
    }

    /// Keeps successfully loaded images in `blobs`.
    pub fn with_local_copies(mut self, blobs: BlobRegistry) -> Self {
        self.local_copies = Some(blobs);
        self
    }

    pub fn cache(&self) -> &SharedCache {
        &self.cache
    }

    // == Resolve ==
    /// Resolves `url` to a renderable reference.
    ///
    /// Returns `None` for a missing or empty URL without touching the
    /// network. Otherwise always returns a value: the cached reference, the
    /// result of the single in-flight load for this key, or the source URL
    /// itself when loading failed.
    pub async fn resolve(&self, url: Option<&str>, options: &ImageOptions) -> Option<String> {
        let url = match url {
            Some(url) if !url.trim().is_empty() => url,
            _ => return None,
        };
        let key = CacheKey::new(url, options);

        let load = {
            let mut store = self.cache.write().await;
            if let Some(value) = store.get(&key) {
                debug!(key = %key, "Image cache hit");
                return Some(value);
            }
            match store.pending(&key) {
                Some(load) => {
                    debug!(key = %key, "Joining in-flight image load");
                    load
                }
                None => self.start_load(&mut store, key),
            }
        };

        Some(load.await)
    }

    // Registers and spawns the load while the write guard is held, so no
    // second caller can slip in between the check and the registration.
    fn start_load(&self, store: &mut CacheStore, key: CacheKey) -> PendingLoad {
        let id = store.next_flight_id();
        debug!(key = %key, flight = id, "Starting image load");

        let task = tokio::spawn(load_image(
            self.cache.clone(),
            self.fetcher.clone(),
            self.local_copies.clone(),
            key.clone(),
            id,
        ));

        let cache = self.cache.clone();
        let task_key = key.clone();
        let load = async move {
            match task.await {
                Ok(value) => value,
                Err(err) => {
                    warn!(key = %task_key, error = %err, "Image load task ended abnormally");
                    cache.write().await.finish_load(&task_key, id, None);
                    task_key.source_url().to_string()
                }
            }
        }
        .boxed()
        .shared();

        store.begin_load(
            key,
            Flight {
                id,
                load: load.clone(),
            },
        );
        load
    }

    // == Invalidate ==
    /// Drops the entry for `key`, releasing its local copy if it has one.
    pub async fn invalidate(&self, key: &CacheKey) -> Option<CacheEntry> {
        let removed = self.cache.write().await.remove(key);
        if let Some(entry) = &removed {
            self.release(entry).await;
        }
        removed
    }

    // == Clear ==
    /// Empties the memory cache and in-flight tracking.
    ///
    /// Every local copy is revoked, including ones made by loads still
    /// running. Returns how many entries were dropped.
    pub async fn clear(&self) -> usize {
        let drained = self.cache.write().await.clear();
        if let Some(blobs) = &self.local_copies {
            let revoked = blobs.revoke_all().await;
            debug!(revoked, "Local image copies revoked");
        }
        drained.len()
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.read().await.stats()
    }

    async fn release(&self, entry: &CacheEntry) {
        if let Some(blobs) = &self.local_copies {
            if entry.is_transient() {
                blobs.revoke(&entry.value).await;
            }
        }
    }
}

// == Load ==
/// Fetches one image and settles its flight.
///
/// Resolves with the cached value on success, and with the source URL on
/// any failure or when the flight was cleared while loading.
async fn load_image(
    cache: SharedCache,
    fetcher: Arc<dyn Fetcher>,
    local_copies: Option<BlobRegistry>,
    key: CacheKey,
    id: u64,
) -> String {
    let url = key.source_url().to_string();

    let loaded = match fetcher.fetch(&url).await {
        Ok(resource) if resource.is_success() && resource.is_image() => {
            Some(keep(resource, &url, local_copies.as_ref()).await)
        }
        Ok(resource) => {
            warn!(
                url = %url,
                status = resource.status,
                content_type = resource.content_type.as_deref().unwrap_or("-"),
                "Image load failed, falling back to source URL"
            );
            None
        }
        Err(err) => {
            warn!(url = %url, error = %err, "Image load failed, falling back to source URL");
            None
        }
    };

    let settled = cache.write().await.finish_load(&key, id, loaded.clone());
    match settled {
        LoadSettled::Stored { evicted } => {
            if let (Some(blobs), Some(entry)) = (&local_copies, evicted) {
                if entry.is_transient() {
                    blobs.revoke(&entry.value).await;
                }
            }
            debug!(key = %key, "Image cached");
            loaded.unwrap_or(url)
        }
        LoadSettled::Failed => url,
        LoadSettled::Discarded => {
            debug!(key = %key, "Cache cleared during load, result discarded");
            if let (Some(blobs), Some(value)) = (&local_copies, &loaded) {
                blobs.revoke(value).await;
            }
            url
        }
    }
}

async fn keep(resource: FetchedResource, url: &str, local_copies: Option<&BlobRegistry>) -> String {
    match local_copies {
        Some(blobs) => {
            let FetchedResource {
                content_type, body, ..
            } = resource;
            blobs.create(content_type.as_deref(), body).await
        }
        None => url.to_string(),
    }
}
