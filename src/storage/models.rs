use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for a stored blob. Created only after the bytes are durably in
/// object storage; never mutated afterwards. `(bucket, object_name)` names
/// exactly one blob for the lifetime of the record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: u64,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub bucket: String,
    pub object_name: String,
}

/// A share link gating downloads of one file by token, expiry, and view
/// count. `is_active` only ever transitions true -> false; exhausted or
/// expired links persist as inactive tombstones until their file is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShareLinkRecord {
    pub id: String,
    pub file_id: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    /// None means the link never expires by time.
    pub expires_at: Option<DateTime<Utc>>,
    /// None means unlimited views.
    pub max_views: Option<u32>,
    pub views: u32,
    pub is_active: bool,
}

impl ShareLinkRecord {
    /// Whether the link currently grants access.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.expires_at.map_or(true, |t| t > now)
            && self.max_views.map_or(true, |m| self.views < m)
    }
}
