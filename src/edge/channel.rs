//! Edge Cache Messaging
//!
//! The edge cache runs behind a message channel: callers ask for its stats
//! and tell it to drop stored images without touching it directly.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::worker::{EdgeCache, EdgeStats};
use crate::error::{CacheError, Result};

const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug)]
pub enum EdgeMessage {
    /// Request/response: the controller answers on `reply`.
    GetCacheStats { reply: oneshot::Sender<EdgeStats> },
    /// Fire-and-forget.
    ClearImageCache,
}

// == Edge Handle ==
/// Sending side of the controller's channel.
#[derive(Debug, Clone)]
pub struct EdgeHandle {
    tx: mpsc::Sender<EdgeMessage>,
}

impl EdgeHandle {
    pub async fn stats(&self) -> Result<EdgeStats> {
        let (reply, rx) = oneshot::channel();
        self.send(EdgeMessage::GetCacheStats { reply }).await?;
        rx.await
            .map_err(|_| CacheError::Internal("edge cache stats unavailable".to_string()))
    }

    /// Queues an image cache clear without waiting for it.
    pub async fn clear_image_cache(&self) -> Result<()> {
        self.send(EdgeMessage::ClearImageCache).await
    }

    async fn send(&self, message: EdgeMessage) -> Result<()> {
        self.tx
            .send(message)
            .await
            .map_err(|_| CacheError::Internal("edge cache controller stopped".to_string()))
    }
}

// == Controller ==
/// Spawns the receiver loop; it ends once every handle is dropped.
pub fn spawn_edge_controller(edge: Arc<EdgeCache>) -> (EdgeHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(CHANNEL_CAPACITY);

    let handle = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            match message {
                EdgeMessage::GetCacheStats { reply } => match edge.stats().await {
                    Ok(stats) => {
                        if reply.send(stats).is_err() {
                            debug!("Stats requester went away");
                        }
                    }
                    Err(err) => warn!(error = %err, "Failed to read edge cache stats"),
                },
                EdgeMessage::ClearImageCache => {
                    if let Err(err) = edge.clear_image_cache().await {
                        warn!(error = %err, "Failed to clear edge image cache");
                    }
                }
            }
        }
        info!("Edge cache controller stopped");
    });

    (EdgeHandle { tx }, handle)
}
