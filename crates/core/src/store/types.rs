//! Types for torrent storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::torrent::InfoHash;

/// Default and maximum number of search results.
pub const MAX_SEARCH_RESULTS: u32 = 100;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Torrent not found: {0}")]
    NotFound(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// A stored torrent row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredTorrent {
    pub source_id: u32,
    pub source_item_id: u64,
    pub title: String,
    pub info_hash: InfoHash,
    pub description: String,
    pub published_at: DateTime<Utc>,
    pub size_bytes: u64,
}

/// Column to order search results by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Size,
    #[default]
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortField {
    /// Newest first for time, alphabetical / smallest first otherwise.
    pub fn default_direction(&self) -> SortDirection {
        match self {
            SortField::Time => SortDirection::Desc,
            SortField::Name | SortField::Size => SortDirection::Asc,
        }
    }
}

/// Query parameters for a title search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TorrentSearchQuery {
    /// Free-text query; every word must match.
    pub query: String,
    #[serde(default)]
    pub order_by: SortField,
    /// Defaults to the field's natural direction.
    #[serde(default)]
    pub direction: Option<SortDirection>,
    /// Capped at [`MAX_SEARCH_RESULTS`].
    #[serde(default)]
    pub limit: Option<u32>,
}

impl TorrentSearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn order_by(mut self, field: SortField, direction: Option<SortDirection>) -> Self {
        self.order_by = field;
        self.direction = direction;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn effective_direction(&self) -> SortDirection {
        self.direction
            .unwrap_or_else(|| self.order_by.default_direction())
    }

    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(MAX_SEARCH_RESULTS)
            .clamp(1, MAX_SEARCH_RESULTS)
    }
}
