/// Background removal of image files that lost their product
///
/// Handlers never delete files inline. After a product is deleted, or its
/// images are replaced, the old paths are enqueued here and a single tokio
/// task removes them. Removal is best-effort: missing files are ignored and
/// failures are logged. Whatever slips through is picked up by the janitor.

use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use super::images::ImageStore;

/// Sender side of the cleanup queue; clone freely
#[derive(Debug, Clone)]
pub struct CleanupQueue {
    tx: mpsc::UnboundedSender<Vec<String>>,
}

impl CleanupQueue {
    /// Spawns the draining task and returns the queue handle
    ///
    /// The task ends once every `CleanupQueue` clone has been dropped and the
    /// remaining batches are processed, so awaiting the handle after shutdown
    /// drains the queue.
    pub fn start(store: ImageStore) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(drain(store, rx));
        (Self { tx }, handle)
    }

    /// Schedules removal of the files behind `urls`
    pub fn enqueue(&self, urls: Vec<String>) {
        if urls.is_empty() {
            return;
        }

        let count = urls.len();
        if self.tx.send(urls).is_err() {
            warn!(count, "Cleanup queue is closed; image files left for the janitor");
        } else {
            debug!(count, "Enqueued image files for cleanup");
        }
    }
}

async fn drain(store: ImageStore, mut rx: mpsc::UnboundedReceiver<Vec<String>>) {
    while let Some(batch) = rx.recv().await {
        let removed = store.remove_urls(&batch).await;
        debug!(requested = batch.len(), removed, "Processed cleanup batch");
    }

    info!("Image cleanup queue drained");
}
