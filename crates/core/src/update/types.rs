//! Types for update runs.

use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::source::{SourceError, SourceOptions};
use crate::store::StoreError;

/// Configuration for the update engine.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Number of concurrent fetch workers. Values below 1 are treated as 1.
    pub thread_count: usize,
    /// Passed to every source the engine opens.
    pub source_options: SourceOptions,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            thread_count: 1,
            source_options: SourceOptions::default(),
        }
    }
}

impl UpdateConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            thread_count: config.main.update_thread_count.max(1),
            source_options: SourceOptions {
                proxy_addr: config.main.proxy_addr.clone(),
                timeout: std::time::Duration::from_secs(config.main.request_timeout_secs),
            },
        }
    }

    pub fn with_thread_count(mut self, thread_count: usize) -> Self {
        self.thread_count = thread_count;
        self
    }

    pub(crate) fn workers(&self) -> usize {
        self.thread_count.max(1)
    }
}

/// Counts reported by a run that had work to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    pub source: String,
    /// Highest id stored before the run.
    pub floor: u64,
    /// Highest id published by the source.
    pub ceiling: u64,
    pub attempted: u64,
    pub succeeded: u64,
    pub failed: u64,
}

/// Result of a run that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UpdateOutcome {
    /// Nothing to fetch; storage already holds the source's newest item.
    UpToDate {
        source: String,
        floor: u64,
        ceiling: u64,
    },
    Updated(UpdateSummary),
}

impl UpdateOutcome {
    pub fn source(&self) -> &str {
        match self {
            UpdateOutcome::UpToDate { source, .. } => source,
            UpdateOutcome::Updated(summary) => &summary.source,
        }
    }

    pub fn is_up_to_date(&self) -> bool {
        matches!(self, UpdateOutcome::UpToDate { .. })
    }
}

/// Errors that end an update run.
///
/// Failures of individual items are never reported here; they are counted
/// in [`UpdateSummary::failed`].
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Failed to open source {name}: {source}")]
    SourceOpen { name: String, source: SourceError },

    #[error("Failed to read latest item id of {name}: {source}")]
    MaxItemId { name: String, source: SourceError },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("Update cancelled")]
    Cancelled,

    #[error("Worker failed: {0}")]
    WorkerFailed(String),
}

impl UpdateError {
    /// Short label used for metrics and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            UpdateError::UnknownSource(_) => "unknown_source",
            UpdateError::SourceOpen { .. } => "source_open",
            UpdateError::MaxItemId { .. } => "max_item_id",
            UpdateError::Storage(_) => "storage",
            UpdateError::Cancelled => "cancelled",
            UpdateError::WorkerFailed(_) => "worker_failed",
        }
    }
}
