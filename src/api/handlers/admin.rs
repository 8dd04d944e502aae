use axum::extract::State;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;

use crate::api::response::JSend;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct SweeperStatusResponse {
    pub sweeper: serde_json::Value,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn health() -> Json<JSend<HealthResponse>> {
    JSend::success(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Cumulative expiry-sweeper counters for the observability collaborator.
pub async fn sweeper_status(
    State(state): State<Arc<AppState>>,
) -> Json<JSend<SweeperStatusResponse>> {
    let snapshot = state.sweep_metrics.snapshot();

    JSend::success(SweeperStatusResponse {
        sweeper: serde_json::json!({
            "runs": snapshot.runs,
            "files_deleted": snapshot.files_deleted,
            "links_deactivated": snapshot.links_deactivated,
            "failed_deletes": snapshot.failed_deletes,
            "last_duration_ms": snapshot.last_duration_ms,
        }),
    })
}
