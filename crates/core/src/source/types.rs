//! Types for the source contract.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::torrent::TorrentRecord;

/// Stable identity of a source.
///
/// `id` is the partition key rows are stored under and is never reused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceIdentity {
    pub id: u32,
    pub name: String,
}

/// Construction parameters passed to every source factory.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    /// Outbound proxy address. Empty means a direct connection.
    pub proxy_addr: String,
    /// Timeout applied to each HTTP request.
    pub timeout: Duration,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            proxy_addr: String::new(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Errors a source can report for a probe or a single item.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    #[error("Item not found: {0}")]
    NotFound(String),

    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Remote format changed: {0}")]
    RemoteFormatChanged(String),
}

impl SourceError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::NotFound(_) => "not_found",
            SourceError::RemoteUnavailable(_) => "remote_unavailable",
            SourceError::RemoteFormatChanged(_) => "remote_format_changed",
        }
    }
}

/// A remote torrent index addressable by numeric item id.
///
/// Implementations must not retry internally; a failed call is reported
/// once and the caller decides what to do with it.
#[async_trait]
pub trait Source: Send + Sync {
    /// Numeric id and human readable name. Pure.
    fn identity(&self) -> SourceIdentity;

    /// Highest item id currently published by the remote index.
    async fn max_item_id(&self) -> Result<u64, SourceError>;

    /// Retrieve and parse a single item.
    async fn fetch_by_id(&self, id: u64) -> Result<TorrentRecord, SourceError>;
}
