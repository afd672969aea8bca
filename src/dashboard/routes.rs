//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::engine::registry::{LoopRegistry, LoopState};
use crate::engine::stats::{build_report, PerformanceReport};
use crate::storage::WatchlistStore;
use crate::types::TrackedItem;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub store: Arc<dyn WatchlistStore>,
    pub loops: LoopRegistry,
    pub win_threshold: f64,
}

impl DashboardState {
    pub fn new(store: Arc<dyn WatchlistStore>, loops: LoopRegistry, win_threshold: f64) -> Self {
        Self {
            store,
            loops,
            win_threshold,
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoopsResponse {
    pub running: usize,
    pub loops: Vec<LoopState>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn internal(e: anyhow::Error) -> ApiError {
    error!(error = %e, "Dashboard query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: format!("{e:#}"),
        }),
    )
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /api/watchlist
pub async fn get_watchlist(
    State(state): State<AppState>,
) -> Result<Json<Vec<TrackedItem>>, ApiError> {
    let items = state.store.scan_by_multiplier_desc().await.map_err(internal)?;
    Ok(Json(items))
}

/// GET /api/report
pub async fn get_report(
    State(state): State<AppState>,
) -> Result<Json<PerformanceReport>, ApiError> {
    let items = state.store.scan_by_multiplier_desc().await.map_err(internal)?;
    Ok(Json(build_report(items, state.win_threshold)))
}

/// GET /api/loops
pub async fn get_loops(State(state): State<AppState>) -> Json<LoopsResponse> {
    let loops = state.loops.snapshot().await;
    let running = loops.iter().filter(|l| !l.status.is_finished()).count();
    Json(LoopsResponse { running, loops })
}

/// GET /api/loops/terminated
pub async fn get_terminated_loops(State(state): State<AppState>) -> Json<Vec<LoopState>> {
    Json(state.loops.terminated().await)
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
