//! Blob Registry
//!
//! Holds image bytes behind transient `blob:<uuid>` references. A reference
//! stops resolving once revoked and can never be rebuilt.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::cache::{is_transient_reference, TRANSIENT_SCHEME};
use crate::error::{CacheError, Result};
use crate::fetch::{FetchedResource, Fetcher};

/// Registry of locally held image copies.
#[derive(Debug, Clone, Default)]
pub struct BlobRegistry {
    blobs: Arc<RwLock<HashMap<String, FetchedResource>>>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a copy of `body` and returns its new reference.
    pub async fn create(&self, content_type: Option<&str>, body: Bytes) -> String {
        let id = Uuid::new_v4().to_string();
        let resource = FetchedResource::new(200, content_type, body);
        self.blobs.write().await.insert(id.clone(), resource);
        debug!(blob = %id, "Created local image copy");
        format!("{TRANSIENT_SCHEME}{id}")
    }

    /// Releases the bytes behind `reference`.
    ///
    /// Returns false if the reference was unknown or already revoked.
    pub async fn revoke(&self, reference: &str) -> bool {
        match blob_id(reference) {
            Some(id) => self.blobs.write().await.remove(id).is_some(),
            None => false,
        }
    }

    /// Revokes every reference, returning how many were held.
    pub async fn revoke_all(&self) -> usize {
        let mut blobs = self.blobs.write().await;
        let count = blobs.len();
        blobs.clear();
        count
    }

    /// Looks up a blob by its bare id (the part after `blob:`).
    pub async fn get_by_id(&self, id: &str) -> Option<FetchedResource> {
        self.blobs.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

/// Extracts the bare id from a `blob:` reference.
pub fn blob_id(reference: &str) -> Option<&str> {
    reference
        .strip_prefix(TRANSIENT_SCHEME)
        .filter(|id| !id.is_empty())
}

// Resolving a reference answers like a fetch: 200 with the bytes while held,
// 404 after revocation.
#[async_trait]
impl Fetcher for BlobRegistry {
    async fn fetch(&self, url: &str) -> Result<FetchedResource> {
        if !is_transient_reference(url) {
            return Err(CacheError::InvalidRequest(format!(
                "not a local reference: {url}"
            )));
        }
        let found = match blob_id(url) {
            Some(id) => self.get_by_id(id).await,
            None => None,
        };
        Ok(found.unwrap_or_else(|| FetchedResource::new(404, Some("text/plain"), "revoked")))
    }
}
