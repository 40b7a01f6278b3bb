//! Scheduled Preload Task
//!
//! Delays a batch preload and keeps a handle that can cancel it.

use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::preload::{BatchOutcome, BatchPreloader};

/// Handle to a pending or running scheduled preload.
#[derive(Debug)]
pub struct ScheduledPreload {
    handle: JoinHandle<BatchOutcome>,
}

impl ScheduledPreload {
    /// Aborts the task.
    ///
    /// Loads the task already handed to the engine keep running; only the
    /// remaining wait and batches are dropped.
    pub fn cancel(&self) {
        if !self.handle.is_finished() {
            debug!("Cancelling scheduled preload");
            self.handle.abort();
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the task; `None` if it was cancelled.
    pub async fn wait(self) -> Option<BatchOutcome> {
        self.handle.await.ok()
    }
}

/// Spawns a task that sleeps for `start_delay` and then preloads `items`.
///
/// # Example
/// ```ignore
/// let pending = spawn_scheduled_preload(preloader.clone(), items, Duration::from_millis(100));
/// // Later, when the consumer goes away:
/// pending.cancel();
/// ```
pub fn spawn_scheduled_preload(
    preloader: BatchPreloader,
    items: Vec<Value>,
    start_delay: Duration,
) -> ScheduledPreload {
    let handle = tokio::spawn(async move {
        tokio::time::sleep(start_delay).await;
        preloader.preload(&items).await
    });

    ScheduledPreload { handle }
}
