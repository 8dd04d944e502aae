use chrono::{DateTime, Utc};
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{FileRecord, ShareLinkRecord};
use super::tables::*;

/// Result of one view-consumption attempt. Everything except `Consumed` is
/// reported to callers as a uniform not-found.
#[derive(Debug)]
pub enum ConsumeOutcome {
    /// No link exists for the token.
    Missing,
    /// The link exists but is inactive, time-expired, or view-exhausted.
    NotUsable,
    /// The link pointed at a file record that no longer exists; the link has
    /// been deactivated.
    DanglingFile,
    Consumed {
        link: ShareLinkRecord,
        file: FileRecord,
    },
}

impl Database {
    // ========================================================================
    // Share link operations
    // ========================================================================

    /// Insert a new share link, its token index row, and its per-file index
    /// entry. Returns false without writing anything if the target file no
    /// longer exists.
    pub fn insert_link(&self, link: &ShareLinkRecord) -> Result<bool, DatabaseError> {
        debug_assert!(!link.token.is_empty(), "link token must not be empty");

        let write_txn = self.begin_write()?;

        let file_exists = {
            let files = write_txn.open_table(FILES)?;
            let exists = files.get(link.file_id.as_str())?.is_some();
            exists
        };
        if !file_exists {
            // Dropping the transaction aborts it
            return Ok(false);
        }

        {
            let mut tokens = write_txn.open_table(LINK_TOKENS)?;
            if tokens.get(link.token.as_str())?.is_some() {
                return Err(DatabaseError::DuplicateToken);
            }
            tokens.insert(link.token.as_str(), link.id.as_str())?;

            let mut links = write_txn.open_table(SHARE_LINKS)?;
            let data = rmp_serde::to_vec_named(link)?;
            links.insert(link.id.as_str(), data.as_slice())?;

            let mut index = write_txn.open_table(FILE_LINKS)?;
            let mut link_ids: Vec<String> = index
                .get(link.file_id.as_str())?
                .map(|v| rmp_serde::from_slice(v.value()).unwrap_or_default())
                .unwrap_or_default();
            if !link_ids.contains(&link.id) {
                link_ids.push(link.id.clone());
                let index_data = rmp_serde::to_vec_named(&link_ids)?;
                index.insert(link.file_id.as_str(), index_data.as_slice())?;
            }
        }

        write_txn.commit()?;
        Ok(true)
    }

    /// Get a share link by its UUID
    pub fn get_link(&self, id: &str) -> Result<Option<ShareLinkRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(SHARE_LINKS)?;

        match table.get(id)? {
            Some(data) => {
                let link: ShareLinkRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(link))
            }
            None => Ok(None),
        }
    }

    /// Get a share link by its token (resolves token -> uuid -> link)
    pub fn get_link_by_token(&self, token: &str) -> Result<Option<ShareLinkRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let token_table = read_txn.open_table(LINK_TOKENS)?;

        let id = match token_table.get(token)? {
            Some(data) => data.value().to_string(),
            None => return Ok(None),
        };

        let links_table = read_txn.open_table(SHARE_LINKS)?;
        match links_table.get(id.as_str())? {
            Some(data) => {
                let link: ShareLinkRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(link))
            }
            None => Ok(None),
        }
    }

    /// First currently-usable link for a file, if any
    pub fn find_usable_link(
        &self,
        file_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ShareLinkRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let index = read_txn.open_table(FILE_LINKS)?;

        let link_ids: Vec<String> = match index.get(file_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(None),
        };

        let links_table = read_txn.open_table(SHARE_LINKS)?;
        for link_id in link_ids {
            if let Some(data) = links_table.get(link_id.as_str())? {
                let link: ShareLinkRecord = rmp_serde::from_slice(data.value())?;
                if link.is_usable(now) {
                    return Ok(Some(link));
                }
            }
        }

        Ok(None)
    }

    /// Consume one view of a share link. This is the gating critical
    /// section: lookup, usability re-check, dangling-file handling, view
    /// increment, and limit-triggered deactivation all happen inside a
    /// single write transaction. redb serializes write transactions, so two
    /// concurrent consumers of a one-view link cannot both observe
    /// `views == 0`; the second sees the deactivated state and gets
    /// `NotUsable`.
    pub fn consume_view(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, DatabaseError> {
        let write_txn = self.begin_write()?;

        let mut outcome = ConsumeOutcome::Missing;
        {
            let tokens = write_txn.open_table(LINK_TOKENS)?;
            let link_id = tokens.get(token)?.map(|v| v.value().to_string());
            drop(tokens);

            if let Some(link_id) = link_id {
                let mut links = write_txn.open_table(SHARE_LINKS)?;
                let raw = links.get(link_id.as_str())?.map(|v| v.value().to_vec());

                if let Some(raw) = raw {
                    let mut link: ShareLinkRecord = rmp_serde::from_slice(&raw)?;

                    if !link.is_usable(now) {
                        outcome = ConsumeOutcome::NotUsable;
                    } else {
                        let file: Option<FileRecord> = {
                            let files = write_txn.open_table(FILES)?;
                            let file = files
                                .get(link.file_id.as_str())?
                                .map(|v| rmp_serde::from_slice(v.value()))
                                .transpose()?;
                            file
                        };

                        match file {
                            None => {
                                link.is_active = false;
                                let data = rmp_serde::to_vec_named(&link)?;
                                links.insert(link_id.as_str(), data.as_slice())?;
                                outcome = ConsumeOutcome::DanglingFile;
                            }
                            Some(file) => {
                                link.views += 1;
                                if link.max_views.is_some_and(|m| link.views >= m) {
                                    link.is_active = false;
                                }
                                let data = rmp_serde::to_vec_named(&link)?;
                                links.insert(link_id.as_str(), data.as_slice())?;
                                outcome = ConsumeOutcome::Consumed { link, file };
                            }
                        }
                    }
                }
            }
        }

        write_txn.commit()?;
        Ok(outcome)
    }

    /// Deactivate up to `limit` active links whose expiry has passed.
    /// Returns the number deactivated.
    pub fn deactivate_expired_links(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<u64, DatabaseError> {
        let write_txn = self.begin_write()?;

        let mut count = 0u64;
        {
            let mut table = write_txn.open_table(SHARE_LINKS)?;

            let mut expired: Vec<(String, ShareLinkRecord)> = Vec::new();
            for result in table.iter()? {
                let (key, value) = result?;
                let link: ShareLinkRecord = rmp_serde::from_slice(value.value())?;
                if link.is_active && link.expires_at.is_some_and(|t| t < now) {
                    expired.push((key.value().to_string(), link));
                    if expired.len() >= limit {
                        break;
                    }
                }
            }

            for (id, mut link) in expired {
                link.is_active = false;
                let data = rmp_serde::to_vec_named(&link)?;
                table.insert(id.as_str(), data.as_slice())?;
                count += 1;
            }
        }

        write_txn.commit()?;
        Ok(count)
    }
}
