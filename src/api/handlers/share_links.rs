use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::response::{ApiError, AppJson, JSend};
use crate::share::Principal;
use crate::storage::models::ShareLinkRecord;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateShareLinkRequest {
    pub file_id: String,
    #[serde(default)]
    pub expire_days: Option<u32>,
    #[serde(default)]
    pub max_views: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct EnsureShareLinkRequest {
    pub file_id: String,
    #[serde(default)]
    pub expire_days: Option<u32>,
    #[serde(default)]
    pub max_views: Option<u32>,
    /// Return an existing usable link for the file instead of minting a new
    /// one, when there is one
    #[serde(default = "default_reuse")]
    pub reuse: bool,
}

fn default_reuse() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct ShareLinkResponse {
    pub token: String,
    pub share_url: String,
    pub expires_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShareMetaResponse {
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub expires_at: Option<String>,
    pub views: u32,
    pub max_views: Option<u32>,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn create_share_link(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppJson(req): AppJson<CreateShareLinkRequest>,
) -> Result<Json<JSend<ShareLinkResponse>>, ApiError> {
    let link = state
        .engine
        .create(&req.file_id, &principal, req.expire_days, req.max_views)
        .await?;

    Ok(JSend::success(link_to_response(&state, &link)))
}

pub async fn ensure_share_link(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    AppJson(req): AppJson<EnsureShareLinkRequest>,
) -> Result<Json<JSend<ShareLinkResponse>>, ApiError> {
    let link = state
        .engine
        .ensure(
            &req.file_id,
            &principal,
            req.expire_days,
            req.max_views,
            req.reuse,
        )
        .await?;

    Ok(JSend::success(link_to_response(&state, &link)))
}

/// Read-only link metadata; consumes no view.
pub async fn share_link_meta(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<JSend<ShareMetaResponse>>, ApiError> {
    let meta = state.engine.meta(&token)?;

    Ok(JSend::success(ShareMetaResponse {
        filename: meta.filename,
        size: meta.size,
        content_type: meta.content_type,
        expires_at: meta.expires_at.map(|t| t.to_rfc3339()),
        views: meta.views,
        max_views: meta.max_views,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn link_to_response(state: &AppState, link: &ShareLinkRecord) -> ShareLinkResponse {
    ShareLinkResponse {
        token: link.token.clone(),
        share_url: state.share_url(&link.token),
        expires_at: link.expires_at.map(|t| t.to_rfc3339()),
    }
}
