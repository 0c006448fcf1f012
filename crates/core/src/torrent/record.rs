use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::InfoHash;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("empty title")]
    EmptyTitle,

    #[error("size must be non-zero")]
    ZeroSize,

    #[error("publication time {0} is not after the Unix epoch")]
    InvalidPublicationTime(DateTime<Utc>),
}

/// Normalized torrent listing produced by a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentRecord {
    pub title: String,
    /// Markdown description. Opaque to the update engine.
    pub body: String,
    pub info_hash: InfoHash,
    pub published_at: DateTime<Utc>,
    pub size_bytes: u64,
}

impl TorrentRecord {
    /// Check the invariants a record must hold before it may be stored.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.title.trim().is_empty() {
            return Err(RecordError::EmptyTitle);
        }
        if self.size_bytes == 0 {
            return Err(RecordError::ZeroSize);
        }
        if self.published_at.timestamp() <= 0 {
            return Err(RecordError::InvalidPublicationTime(self.published_at));
        }
        Ok(())
    }
}

/// A record together with the source-specific id it was fetched under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedItem {
    pub item_id: u64,
    pub record: TorrentRecord,
}
