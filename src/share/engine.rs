use chrono::{DateTime, Duration, Utc};
use ring::rand::SystemRandom;
use thiserror::Error;

use crate::config::LinkConfig;
use crate::storage::models::{FileRecord, ShareLinkRecord};
use crate::storage::{ConsumeOutcome, Database, DatabaseError};

use super::token;

#[derive(Debug, Error)]
pub enum ShareError {
    /// Token or file does not exist, or exists but is unusable. Unusable and
    /// nonexistent are indistinguishable on purpose: probing clients learn
    /// nothing about a link's state.
    #[error("not found")]
    NotFound,
    #[error("access denied")]
    PermissionDenied,
    #[error("invalid request: {0}")]
    Invalid(String),
    #[error("temporarily unavailable: {0}")]
    Unavailable(String),
    #[error("storage error: {0}")]
    Storage(#[from] DatabaseError),
}

/// The caller on whose behalf an operation runs, as supplied by the upstream
/// identity collaborator.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: String,
    pub is_admin: bool,
}

impl Principal {
    pub fn can_manage(&self, file: &FileRecord) -> bool {
        self.is_admin || file.owner_id == self.id
    }
}

/// Read-only view of a link and its file, for the meta endpoint.
#[derive(Debug, Clone)]
pub struct ShareMeta {
    pub filename: String,
    pub size: u64,
    pub content_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub views: u32,
    pub max_views: Option<u32>,
}

/// Creates, resolves, and consumes share links. All state lives in the
/// metadata store; the engine itself is stateless apart from its policy and
/// RNG, so any number of instances may run against the same database.
pub struct ShareLinkEngine {
    db: Database,
    policy: LinkConfig,
    rng: SystemRandom,
}

impl ShareLinkEngine {
    pub fn new(db: Database, policy: LinkConfig) -> Self {
        Self {
            db,
            policy,
            rng: SystemRandom::new(),
        }
    }

    /// Mint a new share link for a file the principal owns (or may
    /// administer). `expire_days` defaults to the policy default and must
    /// stay within the policy ceiling; `max_views` of zero is rejected
    /// rather than silently meaning unlimited.
    pub async fn create(
        &self,
        file_id: &str,
        principal: &Principal,
        expire_days: Option<u32>,
        max_views: Option<u32>,
    ) -> Result<ShareLinkRecord, ShareError> {
        let days = expire_days.unwrap_or(self.policy.default_expire_days);
        if days == 0 || days > self.policy.max_expire_days {
            return Err(ShareError::Invalid(format!(
                "expire_days must be between 1 and {}",
                self.policy.max_expire_days
            )));
        }
        if max_views == Some(0) {
            return Err(ShareError::Invalid(
                "max_views must be at least 1".to_string(),
            ));
        }

        let file = self.db.get_file(file_id)?.ok_or(ShareError::NotFound)?;
        if !principal.can_manage(&file) {
            return Err(ShareError::PermissionDenied);
        }

        let now = Utc::now();
        let link = ShareLinkRecord {
            id: uuid::Uuid::new_v4().to_string(),
            file_id: file.id.clone(),
            token: self.generate_token()?,
            created_at: now,
            expires_at: Some(now + Duration::days(i64::from(days))),
            max_views,
            views: 0,
            is_active: true,
        };

        self.insert(link.clone()).await?;
        tracing::debug!(file_id = %file.id, link_id = %link.id, "Created share link");
        Ok(link)
    }

    /// Return an existing usable link for the file when `reuse` is set and
    /// one exists, otherwise create a fresh one. A convenience against link
    /// proliferation for sequential callers; two racing calls may still mint
    /// two links.
    pub async fn ensure(
        &self,
        file_id: &str,
        principal: &Principal,
        expire_days: Option<u32>,
        max_views: Option<u32>,
        reuse: bool,
    ) -> Result<ShareLinkRecord, ShareError> {
        if reuse {
            // Ownership is checked before an existing token is revealed
            let file = self.db.get_file(file_id)?.ok_or(ShareError::NotFound)?;
            if !principal.can_manage(&file) {
                return Err(ShareError::PermissionDenied);
            }
            if let Some(existing) = self.db.find_usable_link(file_id, Utc::now())? {
                return Ok(existing);
            }
        }

        self.create(file_id, principal, expire_days, max_views).await
    }

    /// Mint the automatic share link for a fresh upload: expires with the
    /// file, unlimited views.
    pub async fn create_for_upload(
        &self,
        file: &FileRecord,
    ) -> Result<ShareLinkRecord, ShareError> {
        let link = ShareLinkRecord {
            id: uuid::Uuid::new_v4().to_string(),
            file_id: file.id.clone(),
            token: self.generate_token()?,
            created_at: Utc::now(),
            expires_at: Some(file.expires_at),
            max_views: None,
            views: 0,
            is_active: true,
        };

        self.insert(link.clone()).await?;
        Ok(link)
    }

    /// Read-only metadata for a usable token. Consumes nothing; unusable,
    /// missing, and dangling tokens all report `NotFound`.
    pub fn meta(&self, token: &str) -> Result<ShareMeta, ShareError> {
        let link = self
            .db
            .get_link_by_token(token)?
            .ok_or(ShareError::NotFound)?;
        if !link.is_usable(Utc::now()) {
            return Err(ShareError::NotFound);
        }
        let file = self
            .db
            .get_file(&link.file_id)?
            .ok_or(ShareError::NotFound)?;

        Ok(ShareMeta {
            filename: file.filename,
            size: file.size,
            content_type: file.content_type,
            expires_at: link.expires_at,
            views: link.views,
            max_views: link.max_views,
        })
    }

    /// Validate a token and spend one view, atomically. This runs before any
    /// byte is streamed: a client that disconnects mid-download has still
    /// consumed its view. The write transaction goes to the blocking pool so
    /// contention on the store cannot stall the request loop.
    pub async fn resolve_and_consume(
        &self,
        token: &str,
    ) -> Result<(ShareLinkRecord, FileRecord), ShareError> {
        let db = self.db.clone();
        let token = token.to_string();
        let outcome = tokio::task::spawn_blocking(move || db.consume_view(&token, Utc::now()))
            .await
            .map_err(|e| ShareError::Unavailable(format!("storage task failed: {e}")))??;

        match outcome {
            ConsumeOutcome::Consumed { link, file } => Ok((link, file)),
            ConsumeOutcome::DanglingFile => {
                tracing::warn!("Deactivated share link pointing at a missing file");
                Err(ShareError::NotFound)
            }
            ConsumeOutcome::Missing | ConsumeOutcome::NotUsable => Err(ShareError::NotFound),
        }
    }

    fn generate_token(&self) -> Result<String, ShareError> {
        token::generate(&self.rng)
            .map_err(|_| ShareError::Unavailable("token generation failed".to_string()))
    }

    async fn insert(&self, link: ShareLinkRecord) -> Result<(), ShareError> {
        let db = self.db.clone();
        let inserted = tokio::task::spawn_blocking(move || db.insert_link(&link))
            .await
            .map_err(|e| ShareError::Unavailable(format!("storage task failed: {e}")))??;

        // The file vanished between the ownership check and the insert
        if !inserted {
            return Err(ShareError::NotFound);
        }
        Ok(())
    }
}
