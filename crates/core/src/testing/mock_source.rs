//! Mock source for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::fixtures;
use crate::source::{Source, SourceError, SourceIdentity};
use crate::torrent::TorrentRecord;

/// Mock implementation of the Source trait.
///
/// Serves [`fixtures::record`] for every id up to the configured maximum.
/// Individual ids can be made to fail or to return records that do not
/// pass validation. Every fetch is recorded.
///
/// # Example
///
/// ```rust,ignore
/// use torrentdb_core::testing::MockSource;
///
/// let source = MockSource::new(1, "mock").with_max_id(10);
/// source.fail_on(3, SourceError::NotFound("gone".into()));
///
/// let record = source.fetch_by_id(4).await?;
/// assert!(source.fetch_by_id(3).await.is_err());
/// assert_eq!(source.fetched_ids(), vec![3, 4]);
/// ```
pub struct MockSource {
    identity: SourceIdentity,
    max_id: Mutex<u64>,
    /// If set, `max_item_id` fails with this error.
    max_id_error: Mutex<Option<SourceError>>,
    failures: Mutex<HashMap<u64, SourceError>>,
    invalid_ids: Mutex<HashSet<u64>>,
    latency: Mutex<Option<Duration>>,
    fetched: Mutex<Vec<u64>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl std::fmt::Debug for MockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSource")
            .field("identity", &self.identity)
            .field("max_id", &self.max_id)
            .finish_non_exhaustive()
    }
}

impl MockSource {
    /// Create a mock source with no items.
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            identity: SourceIdentity {
                id,
                name: name.to_string(),
            },
            max_id: Mutex::new(0),
            max_id_error: Mutex::new(None),
            failures: Mutex::new(HashMap::new()),
            invalid_ids: Mutex::new(HashSet::new()),
            latency: Mutex::new(None),
            fetched: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_max_id(self, max_id: u64) -> Self {
        self.set_max_id(max_id);
        self
    }

    /// Delay every fetch by `latency`.
    pub fn with_latency(self, latency: Duration) -> Self {
        *self.latency.lock().unwrap() = Some(latency);
        self
    }

    pub fn set_max_id(&self, max_id: u64) {
        *self.max_id.lock().unwrap() = max_id;
    }

    /// Make `max_item_id` fail.
    pub fn fail_max_id(&self, error: SourceError) {
        *self.max_id_error.lock().unwrap() = Some(error);
    }

    /// Make fetches of `id` fail with `error`.
    pub fn fail_on(&self, id: u64, error: SourceError) {
        self.failures.lock().unwrap().insert(id, error);
    }

    /// Make fetches of `id` return a record with an empty title.
    pub fn invalid_on(&self, id: u64) {
        self.invalid_ids.lock().unwrap().insert(id);
    }

    /// Ids fetched so far, sorted.
    pub fn fetched_ids(&self) -> Vec<u64> {
        let mut ids = self.fetched.lock().unwrap().clone();
        ids.sort_unstable();
        ids
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }

    /// Highest number of fetches that were in progress at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn clear_recorded(&self) {
        self.fetched.lock().unwrap().clear();
        self.peak_in_flight.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl Source for MockSource {
    fn identity(&self) -> SourceIdentity {
        self.identity.clone()
    }

    async fn max_item_id(&self) -> Result<u64, SourceError> {
        if let Some(error) = self.max_id_error.lock().unwrap().clone() {
            return Err(error);
        }
        Ok(*self.max_id.lock().unwrap())
    }

    async fn fetch_by_id(&self, id: u64) -> Result<TorrentRecord, SourceError> {
        self.fetched.lock().unwrap().push(id);

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        let latency = *self.latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(error) = self.failures.lock().unwrap().get(&id) {
            return Err(error.clone());
        }
        if id == 0 || id > *self.max_id.lock().unwrap() {
            return Err(SourceError::NotFound(format!("item {}", id)));
        }

        let mut record = fixtures::record(id);
        if self.invalid_ids.lock().unwrap().contains(&id) {
            record.title.clear();
        }
        Ok(record)
    }
}
