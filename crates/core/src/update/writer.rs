use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::store::{StoreError, TorrentStore};
use crate::torrent::FetchedItem;

/// What the writer should do with its batch once all items have arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitDecision {
    Commit,
    Discard,
}

/// What the writer did with its batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Committed(usize),
    Discarded(usize),
}

/// Handle for submitting fetched items to the batch writer.
///
/// Cloned into every fetch worker. The writer stops collecting once every
/// handle has been dropped.
#[derive(Debug, Clone)]
pub struct BatchHandle {
    tx: mpsc::Sender<FetchedItem>,
}

impl BatchHandle {
    /// Submit an item. Returns false if the writer is gone.
    pub async fn submit(&self, item: FetchedItem) -> bool {
        self.tx.send(item).await.is_ok()
    }
}

/// Single owner of the write path for one update run.
///
/// Workers never touch storage; they send items here. The writer buffers
/// them and appends the whole batch in one transaction after the coordinator
/// decides to commit.
pub struct BatchWriter {
    rx: mpsc::Receiver<FetchedItem>,
    decision: oneshot::Receiver<CommitDecision>,
    store: Arc<dyn TorrentStore>,
    source_id: u32,
}

impl BatchWriter {
    pub fn new(
        rx: mpsc::Receiver<FetchedItem>,
        decision: oneshot::Receiver<CommitDecision>,
        store: Arc<dyn TorrentStore>,
        source_id: u32,
    ) -> Self {
        Self {
            rx,
            decision,
            store,
            source_id,
        }
    }

    /// Run the writer, collecting items until the channel is closed.
    ///
    /// A dropped decision sender counts as [`CommitDecision::Discard`].
    pub async fn run(mut self) -> Result<BatchOutcome, StoreError> {
        let mut batch = Vec::new();
        while let Some(item) = self.rx.recv().await {
            batch.push(item);
        }

        let decision = self.decision.await.unwrap_or(CommitDecision::Discard);
        if decision == CommitDecision::Discard {
            tracing::info!(
                "Discarding {} fetched items for source {}",
                batch.len(),
                self.source_id
            );
            return Ok(BatchOutcome::Discarded(batch.len()));
        }

        batch.sort_by_key(|item| item.item_id);
        let written = self.store.append_batch(self.source_id, &batch)?;
        tracing::debug!("Committed {} items for source {}", written, self.source_id);
        Ok(BatchOutcome::Committed(written))
    }
}

/// Create the write path for one run.
///
/// Returns:
/// - `BatchHandle` - clone into each worker
/// - `oneshot::Sender<CommitDecision>` - send the verdict after all workers joined
/// - `BatchWriter` - spawn with `tokio::spawn(writer.run())`
pub fn create_batch_writer(
    store: Arc<dyn TorrentStore>,
    source_id: u32,
    buffer_size: usize,
) -> (BatchHandle, oneshot::Sender<CommitDecision>, BatchWriter) {
    let (tx, rx) = mpsc::channel(buffer_size.max(1));
    let (decision_tx, decision_rx) = oneshot::channel();
    let writer = BatchWriter::new(rx, decision_rx, store, source_id);
    (BatchHandle { tx }, decision_tx, writer)
}
