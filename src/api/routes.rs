use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    Router::new()
        // Files
        .route(
            "/upload",
            post(handlers::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files", get(handlers::list_files))
        .route("/files/:id", get(handlers::get_file))
        .route("/files/:id", delete(handlers::delete_file))
        // Share links
        .route("/share-links", post(handlers::create_share_link))
        .route("/share-links/ensure", post(handlers::ensure_share_link))
        .route("/share-links/:token/meta", get(handlers::share_link_meta))
        // Gated download
        .route("/download/:token", get(handlers::download))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .route("/_internal/sweeper", get(handlers::sweeper_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
