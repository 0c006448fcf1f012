use std::sync::Arc;

use axum::{extract::State, http::header, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use super::torrents::ErrorResponse;
use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct SourceStats {
    pub id: u32,
    pub name: String,
    pub torrents: u64,
    /// Highest stored item id; the next update resumes after it.
    pub latest_item_id: u64,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_torrents: u64,
    pub sources: Vec<SourceStats>,
}

/// GET /api/v1/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let internal = |e: torrentdb_core::StoreError| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
    };

    let store = state.store();
    let total_torrents = store.count(None).map_err(internal)?;

    let mut sources = Vec::with_capacity(state.sources().len());
    for source in state.sources() {
        sources.push(SourceStats {
            id: source.id,
            name: source.name.clone(),
            torrents: store.count(Some(source.id)).map_err(internal)?,
            latest_item_id: store.max_stored_id(source.id).map_err(internal)?,
        });
    }

    Ok(Json(StatsResponse {
        total_torrents,
        sources,
    }))
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state);
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
