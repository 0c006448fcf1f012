//! Torrent storage - the durable mirror of every source's listings.
//!
//! Rows are keyed by `(source_id, source_item_id)` and only ever appended.
//! The highest stored item id per source is where the next update resumes.

mod sqlite;
mod types;

pub use sqlite::SqliteTorrentStore;
pub use types::*;

use crate::torrent::{FetchedItem, InfoHash};

/// Trait for torrent storage backends.
pub trait TorrentStore: Send + Sync {
    /// Highest stored item id for a source, or 0 when it has no rows.
    fn max_stored_id(&self, source_id: u32) -> Result<u64, StoreError>;

    /// Append a batch of items in one transaction.
    ///
    /// Either every item becomes visible or none does. Returns the number of
    /// rows written.
    fn append_batch(&self, source_id: u32, items: &[FetchedItem]) -> Result<usize, StoreError>;

    /// Look up a torrent by info-hash.
    fn get_by_info_hash(&self, info_hash: &InfoHash) -> Result<StoredTorrent, StoreError>;

    /// Full-text search over titles and descriptions.
    fn search(&self, query: &TorrentSearchQuery) -> Result<Vec<StoredTorrent>, StoreError>;

    /// Number of stored rows, optionally for a single source.
    fn count(&self, source_id: Option<u32>) -> Result<u64, StoreError>;
}
