//! Torrent lookup and search API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use torrentdb_core::store::{SortDirection, SortField};
use torrentdb_core::torrent::{format_size, format_time, InfoHash, MagnetLink};
use torrentdb_core::{StoreError, StoredTorrent, TorrentSearchQuery};

use crate::state::AppState;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub order_by: Option<SortField>,
    #[serde(default)]
    pub order_direction: Option<SortDirection>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// A stored torrent as returned by the API.
#[derive(Debug, Serialize)]
pub struct TorrentView {
    pub source_id: u32,
    pub source_item_id: u64,
    pub title: String,
    pub info_hash: InfoHash,
    pub magnet: String,
    pub description: String,
    pub published_at: DateTime<Utc>,
    /// Publication time as `dd.mm.yy HH:MM`.
    pub published: String,
    pub size_bytes: u64,
    /// Size with binary units, e.g. `1.5 GiB`.
    pub size: String,
}

impl From<StoredTorrent> for TorrentView {
    fn from(torrent: StoredTorrent) -> Self {
        Self {
            magnet: MagnetLink::from_info_hash(&torrent.info_hash).to_string(),
            published: format_time(&torrent.published_at),
            size: format_size(torrent.size_bytes),
            source_id: torrent.source_id,
            source_item_id: torrent.source_item_id,
            title: torrent.title,
            info_hash: torrent.info_hash,
            description: torrent.description,
            published_at: torrent.published_at,
            size_bytes: torrent.size_bytes,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub torrents: Vec<TorrentView>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: impl ToString) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/torrents/{info_hash}
pub async fn get_torrent(
    State(state): State<Arc<AppState>>,
    Path(info_hash): Path<String>,
) -> Result<Json<TorrentView>, ApiError> {
    let info_hash: InfoHash = info_hash
        .parse()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?;

    match state.store().get_by_info_hash(&info_hash) {
        Ok(torrent) => Ok(Json(torrent.into())),
        Err(e @ StoreError::NotFound(_)) => Err(error_response(StatusCode::NOT_FOUND, e)),
        Err(e) => {
            tracing::error!("Failed to look up {}: {}", info_hash, e);
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}

/// GET /api/v1/search
///
/// Full-text search over titles and descriptions. An empty query returns no
/// results.
pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = TorrentSearchQuery {
        query: params.query,
        order_by: params.order_by.unwrap_or_default(),
        direction: params.order_direction,
        limit: params.limit,
    };

    match state.store().search(&query) {
        Ok(found) => {
            let torrents: Vec<TorrentView> = found.into_iter().map(TorrentView::from).collect();
            let total = torrents.len();
            Ok(Json(SearchResponse { torrents, total }))
        }
        Err(e) => {
            tracing::error!("Search for {:?} failed: {}", query.query, e);
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}
