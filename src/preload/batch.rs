//! Batch Preloader
//!
//! Feeds the image URLs of an item collection through the preload engine in
//! fixed-size, paced batches, at most once per distinct collection.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::ImageOptions;
use crate::preload::{ImagePreloader, ItemFields};
use crate::tasks::{spawn_scheduled_preload, ScheduledPreload};

/// Images resolved concurrently per batch
pub const DEFAULT_BATCH_SIZE: usize = 5;
/// Pause between consecutive batches
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(100);

// == Batch Options ==
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOptions {
    pub batch_size: usize,
    pub delay_between_batches: Duration,
    /// Sizing applied to every image of the collection
    pub image: ImageOptions,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            delay_between_batches: DEFAULT_BATCH_DELAY,
            image: ImageOptions::default(),
        }
    }
}

// == Batch Outcome ==
/// What a `preload` call did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchOutcome {
    /// No items were given
    Empty,
    /// The same collection was already processed or is being processed
    Skipped { marker: String },
    /// Every batch settled
    Completed {
        marker: String,
        urls: usize,
        batches: usize,
    },
}

// == Batch Preloader ==
/// Per-consumer preloader.
///
/// Each consumer (a menu listing, say) owns one; the engine and its cache
/// are shared by all of them. Clones share the marker set and the pending
/// schedule.
#[derive(Clone)]
pub struct BatchPreloader {
    engine: ImagePreloader,
    fields: ItemFields,
    options: BatchOptions,
    processed: Arc<Mutex<HashSet<String>>>,
    scheduled: Arc<Mutex<Option<ScheduledPreload>>>,
}

impl BatchPreloader {
    pub fn new(engine: ImagePreloader, fields: ItemFields, options: BatchOptions) -> Self {
        Self {
            engine,
            fields,
            options,
            processed: Arc::new(Mutex::new(HashSet::new())),
            scheduled: Arc::new(Mutex::new(None)),
        }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    // == Preload ==
    /// Preloads every image of `items`.
    ///
    /// The collection's marker is recorded before any work starts, so a
    /// repeat call with the same identifiers is a no-op even while the first
    /// call is still running. Never fails: individual loads fall back on
    /// their own.
    pub async fn preload(&self, items: &[Value]) -> BatchOutcome {
        if items.is_empty() {
            return BatchOutcome::Empty;
        }

        let marker = self.fields.batch_marker(items);
        if !self.processed.lock().await.insert(marker.clone()) {
            debug!(marker = %marker, "Collection already preloaded, skipping");
            return BatchOutcome::Skipped { marker };
        }

        let urls = self.fields.image_urls(items);
        let batch_size = self.options.batch_size.max(1);
        let mut batches = 0;

        for (index, batch) in urls.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.options.delay_between_batches).await;
            }
            join_all(
                batch
                    .iter()
                    .map(|url| self.engine.resolve(Some(url.as_str()), &self.options.image)),
            )
            .await;
            batches += 1;
            debug!(marker = %marker, batch = index + 1, size = batch.len(), "Preload batch settled");
        }

        info!(
            marker = %marker,
            items = items.len(),
            urls = urls.len(),
            batches,
            "Collection preloaded"
        );
        BatchOutcome::Completed {
            marker,
            urls: urls.len(),
            batches,
        }
    }

    // == Schedule ==
    /// Runs `preload` after `start_delay` on a background task.
    ///
    /// A newer schedule replaces a pending one; the replaced task is
    /// cancelled if it has not finished.
    pub async fn schedule(&self, items: Vec<Value>, start_delay: Duration) {
        let task = spawn_scheduled_preload(self.clone(), items, start_delay);
        if let Some(previous) = self.scheduled.lock().await.replace(task) {
            previous.cancel();
        }
    }

    /// Waits for the pending schedule, if any, and returns its outcome.
    pub async fn wait_scheduled(&self) -> Option<BatchOutcome> {
        let pending = self.scheduled.lock().await.take()?;
        pending.wait().await
    }

    // == Teardown ==
    /// Cancels pending scheduled work and forgets processed collections.
    ///
    /// Loads already handed to the engine are not cancelled.
    pub async fn teardown(&self) {
        if let Some(pending) = self.scheduled.lock().await.take() {
            pending.cancel();
        }
        self.processed.lock().await.clear();
    }

    /// Number of distinct collections processed so far.
    pub async fn processed_count(&self) -> usize {
        self.processed.lock().await.len()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStore;
    use crate::fetch::mock::MockFetcher;
    use serde_json::json;
    use std::time::Instant;

    fn menu(ids: &[u32]) -> Vec<Value> {
        ids.iter()
            .map(|id| json!({"id": id, "image": {"url": format!("https://cdn.test/{id}.jpg")}}))
            .collect()
    }

    fn fetcher_for(ids: &[u32], delay: Duration) -> MockFetcher {
        ids.iter().fold(MockFetcher::with_delay(delay), |f, id| {
            f.image(&format!("https://cdn.test/{id}.jpg"))
        })
    }

    fn batch_preloader(fetcher: Arc<MockFetcher>, options: BatchOptions) -> BatchPreloader {
        let engine = ImagePreloader::new(CacheStore::shared(100), fetcher);
        BatchPreloader::new(engine, ItemFields::default(), options)
    }

    fn fast_options(batch_size: usize) -> BatchOptions {
        BatchOptions {
            batch_size,
            delay_between_batches: Duration::from_millis(5),
            image: ImageOptions::default(),
        }
    }

    #[tokio::test]
    async fn test_preload_resolves_every_url() {
        let ids = [1, 2, 3, 4, 5, 6, 7];
        let fetcher = Arc::new(fetcher_for(&ids, Duration::ZERO));
        let preloader = batch_preloader(fetcher.clone(), fast_options(3));

        let outcome = preloader.preload(&menu(&ids)).await;

        assert_eq!(
            outcome,
            BatchOutcome::Completed {
                marker: "1-2-3-4-5-6-7".to_string(),
                urls: 7,
                batches: 3,
            }
        );
        assert_eq!(fetcher.calls(), 7);
        let mut expected: Vec<String> = ids.iter().map(|id| format!("https://cdn.test/{id}.jpg")).collect();
        let mut requested = fetcher.requested();
        expected.sort();
        requested.sort();
        assert_eq!(requested, expected);
    }

    #[tokio::test]
    async fn test_items_without_image_are_dropped() {
        let fetcher = Arc::new(fetcher_for(&[1], Duration::ZERO));
        let preloader = batch_preloader(fetcher.clone(), fast_options(5));
        let items = vec![
            json!({"id": 1, "image": {"url": "https://cdn.test/1.jpg"}}),
            json!({"id": 2, "image": null}),
            json!({"id": 3}),
        ];

        let outcome = preloader.preload(&items).await;

        assert!(matches!(outcome, BatchOutcome::Completed { urls: 1, .. }));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_items_are_a_noop() {
        let fetcher = Arc::new(MockFetcher::new());
        let preloader = batch_preloader(fetcher.clone(), fast_options(5));

        assert_eq!(preloader.preload(&[]).await, BatchOutcome::Empty);
        assert_eq!(preloader.processed_count().await, 0);
    }

    #[tokio::test]
    async fn test_same_collection_is_preloaded_once() {
        let ids = [1, 2, 3];
        let fetcher = Arc::new(fetcher_for(&ids, Duration::ZERO));
        let preloader = batch_preloader(fetcher.clone(), fast_options(5));

        preloader.preload(&menu(&ids)).await;
        let second = preloader.preload(&menu(&ids)).await;

        assert!(matches!(second, BatchOutcome::Skipped { .. }));
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_rapid_duplicate_calls_issue_requests_once() {
        let ids = [1, 2, 3, 4];
        let fetcher = Arc::new(fetcher_for(&ids, Duration::from_millis(40)));
        let preloader = batch_preloader(fetcher.clone(), fast_options(2));
        let items = menu(&ids);

        let (first, second) = tokio::join!(preloader.preload(&items), preloader.preload(&items));

        assert!(matches!(first, BatchOutcome::Completed { .. }));
        assert!(matches!(second, BatchOutcome::Skipped { .. }));
        assert_eq!(fetcher.calls(), 4);
    }

    #[tokio::test]
    async fn test_batches_run_sequentially_with_pacing() {
        let ids = [1, 2, 3, 4];
        let fetcher = Arc::new(fetcher_for(&ids, Duration::from_millis(30)));
        let options = BatchOptions {
            batch_size: 2,
            delay_between_batches: Duration::from_millis(50),
            image: ImageOptions::default(),
        };
        let preloader = batch_preloader(fetcher.clone(), options);

        let started = Instant::now();
        preloader.preload(&menu(&ids)).await;
        let elapsed = started.elapsed();

        // Two sequential batches of 30ms plus one 50ms pause
        assert!(elapsed >= Duration::from_millis(110), "elapsed {elapsed:?}");
        assert_eq!(fetcher.calls(), 4);
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_batch() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .unreachable("https://cdn.test/1.jpg")
                .image("https://cdn.test/2.jpg"),
        );
        let preloader = batch_preloader(fetcher.clone(), fast_options(1));

        let outcome = preloader.preload(&menu(&[1, 2, 3])).await;

        assert!(matches!(outcome, BatchOutcome::Completed { urls: 3, batches: 3, .. }));
        assert_eq!(fetcher.calls(), 3);
    }

    #[tokio::test]
    async fn test_schedule_runs_after_delay() {
        let ids = [1, 2];
        let fetcher = Arc::new(fetcher_for(&ids, Duration::ZERO));
        let preloader = batch_preloader(fetcher.clone(), fast_options(5));

        preloader.schedule(menu(&ids), Duration::from_millis(20)).await;
        assert_eq!(fetcher.calls(), 0);

        let outcome = preloader.wait_scheduled().await;
        assert!(matches!(outcome, Some(BatchOutcome::Completed { urls: 2, .. })));
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_new_schedule_replaces_pending_one() {
        let fetcher = Arc::new(fetcher_for(&[1, 2, 3], Duration::ZERO));
        let preloader = batch_preloader(fetcher.clone(), fast_options(5));

        preloader.schedule(menu(&[1, 2]), Duration::from_millis(50)).await;
        preloader.schedule(menu(&[3]), Duration::from_millis(10)).await;
        preloader.wait_scheduled().await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert_eq!(fetcher.requested(), vec!["https://cdn.test/3.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_teardown_cancels_pending_and_clears_markers() {
        let ids = [1, 2];
        let fetcher = Arc::new(fetcher_for(&ids, Duration::ZERO));
        let preloader = batch_preloader(fetcher.clone(), fast_options(5));

        preloader.preload(&menu(&ids)).await;
        preloader.schedule(menu(&[9]), Duration::from_millis(30)).await;
        preloader.teardown().await;
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(preloader.processed_count().await, 0);

        // After teardown the same collection is accepted again; its images
        // are already cached so no new requests go out
        let again = preloader.preload(&menu(&ids)).await;
        assert!(matches!(again, BatchOutcome::Completed { .. }));
        assert_eq!(fetcher.calls(), 2);
    }
}
