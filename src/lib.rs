//! file-share - A file-sharing API with gated, expiring download links
//!
//! This crate provides file upload, token-gated download, and automatic
//! expiry with:
//! - Swappable object storage backends (local filesystem, GCS)
//! - redb embedded database for metadata (ACID, MVCC, crash-safe)
//! - Share links gated by token, expiry timestamp, and view count
//! - A background sweeper reclaiming expired links and files

pub mod api;
pub mod config;
pub mod object_store;
pub mod retry;
pub mod share;
pub mod storage;
pub mod sweep;

use std::sync::Arc;

use config::Config;
use share::ShareLinkEngine;
use storage::Database;
use sweep::SweepMetrics;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub db: Database,
    pub engine: ShareLinkEngine,
    pub object_store: Arc<dyn object_store::ObjectStore>,
    pub sweep_metrics: Arc<SweepMetrics>,
}

impl AppState {
    /// Externally reachable download URL for a token.
    pub fn share_url(&self, token: &str) -> String {
        format!("{}/download/{token}", self.config.server.public_base_url)
    }
}
