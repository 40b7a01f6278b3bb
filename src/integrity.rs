//! Cache Integrity
//!
//! Audits entries whose value is a transient local reference and reloads the
//! ones that no longer resolve.

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{CacheEntry, CacheKey, SharedCache};
use crate::fetch::Fetcher;
use crate::preload::ImagePreloader;

// == Reports ==
/// An entry whose local reference failed to resolve.
#[derive(Debug, Clone, Serialize)]
pub struct IntegrityIssue {
    /// Rendered cache key
    pub key: String,
    /// Source URL the entry was loaded from
    pub url: String,
    /// The reference that failed
    pub reference: String,
    pub reason: String,
    #[serde(skip)]
    pub cache_key: CacheKey,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IntegrityReport {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub errors: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    fn record_invalid(&mut self, entry: CacheEntry, reason: String) {
        self.invalid += 1;
        self.errors.push(IntegrityIssue {
            key: entry.key.to_string(),
            url: entry.key.source_url().to_string(),
            reference: entry.value,
            reason,
            cache_key: entry.key,
        });
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RepairReport {
    pub checked: usize,
    pub invalid: usize,
    pub repaired: usize,
    pub failed: usize,
}

// == Validate ==
/// Checks every cached entry.
///
/// Transient references are fetched through `fetcher` and count as valid only
/// on a 2xx answer. Remote URLs are assumed valid without a request.
pub async fn validate_cache_integrity(cache: &SharedCache, fetcher: &dyn Fetcher) -> IntegrityReport {
    let entries = cache.read().await.entries();
    let mut report = IntegrityReport {
        total: entries.len(),
        ..IntegrityReport::default()
    };

    for entry in entries {
        if !entry.is_transient() {
            report.valid += 1;
            continue;
        }
        match fetcher.fetch(&entry.value).await {
            Ok(resource) if resource.is_success() => report.valid += 1,
            Ok(resource) => {
                let reason = format!("local reference answered HTTP {}", resource.status);
                report.record_invalid(entry, reason);
            }
            Err(err) => report.record_invalid(entry, err.to_string()),
        }
    }

    info!(
        total = report.total,
        valid = report.valid,
        invalid = report.invalid,
        "Cache integrity checked"
    );
    report
}

// == Repair ==
/// Drops every invalid entry and loads its image again.
///
/// Each entry is reloaded with the URL and options recorded in its key. A
/// reload that does not end up cached is logged and counted as failed; the
/// remaining entries are still repaired.
pub async fn repair_corrupted_blobs(preloader: &ImagePreloader, fetcher: &dyn Fetcher) -> RepairReport {
    let integrity = validate_cache_integrity(preloader.cache(), fetcher).await;
    let mut report = RepairReport {
        checked: integrity.total,
        invalid: integrity.invalid,
        ..RepairReport::default()
    };

    for issue in integrity.errors {
        let key = issue.cache_key;
        preloader.invalidate(&key).await;
        preloader
            .resolve(Some(key.source_url()), &key.options())
            .await;

        if preloader.cache().read().await.has(&key) {
            report.repaired += 1;
        } else {
            report.failed += 1;
            warn!(key = %key, reason = %issue.reason, "Could not repair cached image");
        }
    }

    if report.invalid > 0 {
        info!(
            repaired = report.repaired,
            failed = report.failed,
            "Corrupted cache entries repaired"
        );
    }
    report
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use bytes::Bytes;

    use crate::blobs::BlobRegistry;
    use crate::cache::{CacheStore, ImageOptions};
    use crate::fetch::mock::MockFetcher;

    const REMOTE: &str = "https://cdn.test/menu/ramen.jpg";
    const LOCAL_SOURCE: &str = "https://cdn.test/menu/gyoza_2.jpg";

    #[tokio::test]
    async fn test_remote_valid_and_revoked_blob_invalid() {
        let cache = CacheStore::shared(10);
        let blobs = BlobRegistry::new();
        let revoked = blobs.create(Some("image/png"), Bytes::from_static(b"x")).await;
        blobs.revoke(&revoked).await;
        {
            let mut store = cache.write().await;
            store.put(CacheKey::new(REMOTE, &ImageOptions::default()), REMOTE.to_string());
            store.put(CacheKey::new(LOCAL_SOURCE, &ImageOptions::default()), revoked.clone());
        }

        let report = validate_cache_integrity(&cache, &blobs).await;

        assert_eq!(report.total, 2);
        assert_eq!(report.valid, 1);
        assert_eq!(report.invalid, 1);
        let issue = &report.errors[0];
        assert_eq!(issue.url, LOCAL_SOURCE);
        assert_eq!(issue.reference, revoked);
        assert!(issue.reason.contains("404"), "reason: {}", issue.reason);
    }

    #[tokio::test]
    async fn test_unreachable_reference_is_invalid_with_reason() {
        let cache = CacheStore::shared(10);
        cache.write().await.put(
            CacheKey::new(LOCAL_SOURCE, &ImageOptions::default()),
            "blob:gone".to_string(),
        );
        let fetcher = MockFetcher::new().unreachable("blob:gone");

        let report = validate_cache_integrity(&cache, &fetcher).await;

        assert_eq!(report.invalid, 1);
        assert!(report.errors[0].reason.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_remote_entries_are_not_fetched() {
        let cache = CacheStore::shared(10);
        cache
            .write()
            .await
            .put(CacheKey::new(REMOTE, &ImageOptions::default()), REMOTE.to_string());
        let fetcher = MockFetcher::new();

        let report = validate_cache_integrity(&cache, &fetcher).await;

        assert_eq!(report.valid, 1);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_repair_reloads_with_original_options() {
        let fetcher = Arc::new(MockFetcher::new().image(LOCAL_SOURCE));
        let blobs = BlobRegistry::new();
        let preloader = ImagePreloader::new(CacheStore::shared(10), fetcher.clone())
            .with_local_copies(blobs.clone());
        let options = ImageOptions::sized(640, 480, 60);
        let key = CacheKey::new(LOCAL_SOURCE, &options);

        let original = preloader.resolve(Some(LOCAL_SOURCE), &options).await.unwrap();
        blobs.revoke(&original).await;

        let report = repair_corrupted_blobs(&preloader, &blobs).await;

        assert_eq!(report.invalid, 1);
        assert_eq!(report.repaired, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(fetcher.calls(), 2);

        let repaired = preloader.cache().write().await.get(&key).unwrap();
        assert_ne!(repaired, original);
        assert_eq!(blobs.fetch(&repaired).await.unwrap().status, 200);
    }

    #[tokio::test]
    async fn test_repair_continues_past_failures() {
        let broken = "https://cdn.test/menu/broken.jpg";
        let fetcher = Arc::new(MockFetcher::new().image(LOCAL_SOURCE).unreachable(broken));
        let blobs = BlobRegistry::new();
        let preloader = ImagePreloader::new(CacheStore::shared(10), fetcher)
            .with_local_copies(blobs.clone());
        {
            let mut store = preloader.cache().write().await;
            store.put(CacheKey::new(broken, &ImageOptions::default()), "blob:a".to_string());
            store.put(CacheKey::new(LOCAL_SOURCE, &ImageOptions::default()), "blob:b".to_string());
        }

        let report = repair_corrupted_blobs(&preloader, &blobs).await;

        assert_eq!(report.invalid, 2);
        assert_eq!(report.repaired, 1);
        assert_eq!(report.failed, 1);
        let store = preloader.cache().read().await;
        assert!(!store.has(&CacheKey::new(broken, &ImageOptions::default())));
        assert!(store.has(&CacheKey::new(LOCAL_SOURCE, &ImageOptions::default())));
    }
}
