//! Incremental update of one source.

use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, info, warn};

use super::writer::{create_batch_writer, BatchHandle, BatchOutcome, CommitDecision};
use super::{UpdateConfig, UpdateError, UpdateOutcome, UpdateSummary};
use crate::metrics;
use crate::source::{RegistryError, Source, SourceError, SourceIdentity, SourceRegistry};
use crate::store::TorrentStore;
use crate::torrent::{FetchedItem, TorrentRecord};

/// Per-run counters shared by the fetch workers.
#[derive(Debug, Default)]
struct RunCounters {
    attempted: AtomicU64,
    failed: AtomicU64,
}

/// Brings the stored copy of a source up to date with the remote.
///
/// One run reads the highest stored id (`floor`) and the highest published
/// id (`ceiling`), fetches `floor + 1..=ceiling` with a bounded pool of
/// workers, and appends every valid record in a single transaction.
pub struct UpdateEngine {
    registry: Arc<SourceRegistry>,
    store: Arc<dyn TorrentStore>,
    config: UpdateConfig,
    shutdown: Option<watch::Receiver<bool>>,
}

impl UpdateEngine {
    pub fn new(
        registry: Arc<SourceRegistry>,
        store: Arc<dyn TorrentStore>,
        config: UpdateConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
            shutdown: None,
        }
    }

    /// Abort runs when `shutdown` becomes true. Nothing is committed for an
    /// aborted run.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Update the source registered under `name`.
    pub async fn update(&self, name: &str) -> Result<UpdateOutcome, UpdateError> {
        let source = self
            .registry
            .open(name, &self.config.source_options)
            .map_err(|e| match e {
                RegistryError::UnknownSource(name) => UpdateError::UnknownSource(name),
                RegistryError::Open { name, source } => UpdateError::SourceOpen { name, source },
            })?;

        self.update_source(source).await
    }

    /// Update an already opened source.
    pub async fn update_source(
        &self,
        source: Arc<dyn Source>,
    ) -> Result<UpdateOutcome, UpdateError> {
        let identity = source.identity();
        let started = Instant::now();

        let result = self.run(source, &identity).await;

        let outcome = match &result {
            Ok(UpdateOutcome::UpToDate { .. }) => "up_to_date",
            Ok(UpdateOutcome::Updated(_)) => "updated",
            Err(UpdateError::Cancelled) => "cancelled",
            Err(_) => "failed",
        };
        metrics::UPDATE_RUNS
            .with_label_values(&[identity.name.as_str(), outcome])
            .inc();
        metrics::UPDATE_DURATION
            .with_label_values(&[identity.name.as_str()])
            .observe(started.elapsed().as_secs_f64());

        result
    }

    async fn run(
        &self,
        source: Arc<dyn Source>,
        identity: &SourceIdentity,
    ) -> Result<UpdateOutcome, UpdateError> {
        let floor = self.store.max_stored_id(identity.id)?;

        let ceiling = source.max_item_id().await;
        record_request(&identity.name, "max_item_id", &ceiling);
        let ceiling = ceiling.map_err(|source| UpdateError::MaxItemId {
            name: identity.name.clone(),
            source,
        })?;

        if ceiling <= floor {
            info!(
                "Source {} is up to date (stored {}, remote {})",
                identity.name, floor, ceiling
            );
            return Ok(UpdateOutcome::UpToDate {
                source: identity.name.clone(),
                floor,
                ceiling,
            });
        }

        let workers = self.config.workers();
        info!(
            source = %identity.name,
            floor,
            ceiling,
            workers,
            "Fetching {} new items",
            ceiling - floor
        );

        let (id_tx, id_rx) = mpsc::channel(workers * 2);
        let id_rx = Arc::new(Mutex::new(id_rx));
        let (batch, decision, writer) =
            create_batch_writer(Arc::clone(&self.store), identity.id, workers * 4);
        let counters = Arc::new(RunCounters::default());

        let writer_task = tokio::spawn(writer.run());
        let producer = tokio::spawn(produce_ids(id_tx, floor + 1..=ceiling));

        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                tokio::spawn(fetch_worker(
                    worker,
                    Arc::clone(&source),
                    identity.name.clone(),
                    Arc::clone(&id_rx),
                    batch.clone(),
                    Arc::clone(&counters),
                    self.shutdown.clone(),
                ))
            })
            .collect();
        drop(batch);
        drop(id_rx);

        // Every worker must be joined before the commit decision.
        let panicked = join_all(handles)
            .await
            .into_iter()
            .filter(|joined| joined.is_err())
            .count();
        if let Err(e) = producer.await {
            warn!("Id producer for {} failed: {}", identity.name, e);
        }

        let cancelled = self.is_cancelled();
        let verdict = if panicked == 0 && !cancelled {
            CommitDecision::Commit
        } else {
            CommitDecision::Discard
        };
        // The writer only stops listening if it panicked, which is reported below.
        let _ = decision.send(verdict);

        let written = writer_task
            .await
            .map_err(|e| UpdateError::WorkerFailed(format!("batch writer: {}", e)))?;

        if panicked > 0 {
            return Err(UpdateError::WorkerFailed(format!(
                "{} fetch worker(s) panicked",
                panicked
            )));
        }
        if cancelled {
            info!("Update of {} cancelled, nothing committed", identity.name);
            return Err(UpdateError::Cancelled);
        }

        let written = match written? {
            BatchOutcome::Committed(written) => written as u64,
            BatchOutcome::Discarded(_) => 0,
        };

        let attempted = counters.attempted.load(Ordering::SeqCst);
        let failed = counters.failed.load(Ordering::SeqCst);
        let summary = UpdateSummary {
            source: identity.name.clone(),
            floor,
            ceiling,
            attempted,
            succeeded: written,
            failed,
        };

        metrics::UPDATE_ITEMS
            .with_label_values(&[identity.name.as_str(), "succeeded"])
            .inc_by(summary.succeeded);
        metrics::UPDATE_ITEMS
            .with_label_values(&[identity.name.as_str(), "failed"])
            .inc_by(summary.failed);

        info!(
            "Updated {}: attempted {}, succeeded {}, failed {}",
            summary.source, summary.attempted, summary.succeeded, summary.failed
        );

        Ok(UpdateOutcome::Updated(summary))
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown
            .as_ref()
            .map(|rx| *rx.borrow())
            .unwrap_or(false)
    }
}

/// Feed every id of the range to the workers, then close the stream.
async fn produce_ids(tx: mpsc::Sender<u64>, ids: RangeInclusive<u64>) {
    for id in ids {
        // All workers are gone; the run was cancelled.
        if tx.send(id).await.is_err() {
            break;
        }
    }
}

/// Pull ids until the stream is exhausted, sending valid records to the writer.
async fn fetch_worker(
    worker: usize,
    source: Arc<dyn Source>,
    source_name: String,
    ids: Arc<Mutex<mpsc::Receiver<u64>>>,
    batch: BatchHandle,
    counters: Arc<RunCounters>,
    mut shutdown: Option<watch::Receiver<bool>>,
) {
    debug!("Fetch worker {} for {} started", worker, source_name);

    loop {
        if shutdown.as_ref().is_some_and(|rx| *rx.borrow()) {
            break;
        }

        let next = ids.lock().await.recv().await;
        let Some(id) = next else {
            break;
        };
        counters.attempted.fetch_add(1, Ordering::SeqCst);

        let fetched = match shutdown.as_mut() {
            Some(rx) => tokio::select! {
                result = source.fetch_by_id(id) => result,
                _ = shutdown_requested(rx) => break,
            },
            None => source.fetch_by_id(id).await,
        };

        let checked = fetched.and_then(checked_record);
        record_request(&source_name, "fetch_by_id", &checked);

        match checked {
            Ok(record) => {
                if !batch.submit(FetchedItem { item_id: id, record }).await {
                    warn!("Batch writer for {} closed early", source_name);
                    counters.failed.fetch_add(1, Ordering::SeqCst);
                }
            }
            Err(e) => {
                warn!(
                    source = %source_name,
                    item_id = id,
                    kind = e.kind(),
                    "Failed to fetch item: {}",
                    e
                );
                counters.failed.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    debug!("Fetch worker {} for {} stopped", worker, source_name);
}

/// A record that fails validation is a parse failure, not a storable row.
fn checked_record(record: TorrentRecord) -> Result<TorrentRecord, SourceError> {
    record
        .validate()
        .map_err(|e| SourceError::RemoteFormatChanged(e.to_string()))?;
    Ok(record)
}

async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        // Sender dropped without signalling; never resolve.
        std::future::pending::<()>().await;
    }
}

fn record_request<T>(source: &str, operation: &str, result: &Result<T, SourceError>) {
    let status = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    metrics::SOURCE_REQUESTS
        .with_label_values(&[source, operation, status])
        .inc();
}
