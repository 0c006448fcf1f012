//! Testing utilities and mock implementations.
//!
//! [`MockSource`] stands in for a remote tracker so the update engine can be
//! exercised without network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use torrentdb_core::source::{Source, SourceRegistry};
//! use torrentdb_core::testing::MockSource;
//!
//! let source = Arc::new(MockSource::new(1, "mock").with_max_id(10));
//! let mut registry = SourceRegistry::new();
//! let shared = Arc::clone(&source);
//! registry.register("mock", move |_| Ok(Arc::clone(&shared) as Arc<dyn Source>));
//! ```

mod mock_source;

pub use mock_source::MockSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{TimeZone, Utc};

    use crate::torrent::{FetchedItem, InfoHash, TorrentRecord, INFO_HASH_LEN};

    /// Base publication time for fixture records (2020-09-13).
    const BASE_TIMESTAMP: i64 = 1_600_000_000;

    /// A distinct info-hash derived from `n`.
    pub fn info_hash(n: u64) -> InfoHash {
        let mut bytes = [0xabu8; INFO_HASH_LEN];
        bytes[INFO_HASH_LEN - 8..].copy_from_slice(&n.to_be_bytes());
        InfoHash::new(bytes)
    }

    /// A valid record for item `id`. Later ids are published later.
    pub fn record(id: u64) -> TorrentRecord {
        TorrentRecord {
            title: format!("Torrent {}", id),
            body: format!("Description of torrent {}", id),
            info_hash: info_hash(id),
            published_at: Utc
                .timestamp_opt(BASE_TIMESTAMP + id as i64 * 60, 0)
                .single()
                .unwrap_or_default(),
            size_bytes: 1024 * (id + 1),
        }
    }

    pub fn item(id: u64) -> FetchedItem {
        FetchedItem {
            item_id: id,
            record: record(id),
        }
    }

    pub fn items(ids: impl IntoIterator<Item = u64>) -> Vec<FetchedItem> {
        ids.into_iter().map(item).collect()
    }
}
