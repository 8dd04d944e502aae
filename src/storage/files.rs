use chrono::{DateTime, Utc};
use redb::ReadableTable;

use super::db::{Database, DatabaseError};
use super::models::{FileRecord, ShareLinkRecord};
use super::tables::*;

impl Database {
    // ========================================================================
    // File operations
    // ========================================================================

    /// Store a file record and update the owner index
    pub fn put_file(&self, file: &FileRecord) -> Result<(), DatabaseError> {
        debug_assert!(!file.id.is_empty(), "file id must not be empty");
        debug_assert!(
            !file.object_name.is_empty(),
            "file object_name must not be empty"
        );

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(FILES)?;
            let data = rmp_serde::to_vec_named(file)?;
            table.insert(file.id.as_str(), data.as_slice())?;

            let mut owner_table = write_txn.open_table(OWNER_FILES)?;
            let mut file_ids: Vec<String> = owner_table
                .get(file.owner_id.as_str())?
                .map(|v| rmp_serde::from_slice(v.value()).unwrap_or_default())
                .unwrap_or_default();

            if !file_ids.contains(&file.id) {
                file_ids.push(file.id.clone());
                let index_data = rmp_serde::to_vec_named(&file_ids)?;
                owner_table.insert(file.owner_id.as_str(), index_data.as_slice())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Get a file by its UUID
    pub fn get_file(&self, id: &str) -> Result<Option<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        match table.get(id)? {
            Some(data) => {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                Ok(Some(file))
            }
            None => Ok(None),
        }
    }

    /// Get all files belonging to an owner
    pub fn get_files_by_owner(&self, owner_id: &str) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let owner_table = read_txn.open_table(OWNER_FILES)?;
        let files_table = read_txn.open_table(FILES)?;

        let file_ids: Vec<String> = match owner_table.get(owner_id)? {
            Some(data) => rmp_serde::from_slice(data.value())?,
            None => return Ok(Vec::new()),
        };

        let mut files = Vec::new();
        for file_id in file_ids {
            if let Some(data) = files_table.get(file_id.as_str())? {
                let file: FileRecord = rmp_serde::from_slice(data.value())?;
                files.push(file);
            }
        }

        Ok(files)
    }

    /// Delete a file and everything hanging off it: the owner index entry and
    /// every child share link (records plus their token index rows). Runs in
    /// one write transaction so a half-deleted file is never observable.
    pub fn delete_file(&self, id: &str) -> Result<bool, DatabaseError> {
        let write_txn = self.begin_write()?;

        let owner_id: Option<String> = {
            let table = write_txn.open_table(FILES)?;
            let owner_id = match table.get(id)? {
                Some(data) => {
                    let file: FileRecord = rmp_serde::from_slice(data.value())?;
                    Some(file.owner_id)
                }
                None => None,
            };
            owner_id
        };

        let deleted = match owner_id {
            Some(owner_id) => {
                {
                    let mut table = write_txn.open_table(FILES)?;
                    table.remove(id)?;
                }

                // Owner index cleanup
                {
                    let file_ids: Option<Vec<String>> = {
                        let owner_table = write_txn.open_table(OWNER_FILES)?;
                        let file_ids = match owner_table.get(owner_id.as_str())? {
                            Some(data) => Some(rmp_serde::from_slice(data.value())?),
                            None => None,
                        };
                        file_ids
                    };

                    if let Some(mut ids) = file_ids {
                        ids.retain(|fid| fid != id);
                        let mut owner_table = write_txn.open_table(OWNER_FILES)?;
                        if ids.is_empty() {
                            owner_table.remove(owner_id.as_str())?;
                        } else {
                            let new_data = rmp_serde::to_vec_named(&ids)?;
                            owner_table.insert(owner_id.as_str(), new_data.as_slice())?;
                        }
                    }
                }

                // Cascade: remove child share links and their token rows
                {
                    let link_ids: Vec<String> = {
                        let index = write_txn.open_table(FILE_LINKS)?;
                        let link_ids = match index.get(id)? {
                            Some(data) => rmp_serde::from_slice(data.value())?,
                            None => Vec::new(),
                        };
                        link_ids
                    };

                    let mut links = write_txn.open_table(SHARE_LINKS)?;
                    let mut tokens = write_txn.open_table(LINK_TOKENS)?;
                    for link_id in &link_ids {
                        let token: Option<String> = links
                            .get(link_id.as_str())?
                            .map(|v| rmp_serde::from_slice::<ShareLinkRecord>(v.value()))
                            .transpose()?
                            .map(|link| link.token);
                        links.remove(link_id.as_str())?;
                        if let Some(token) = token {
                            tokens.remove(token.as_str())?;
                        }
                    }
                    drop(links);
                    drop(tokens);

                    let mut index = write_txn.open_table(FILE_LINKS)?;
                    index.remove(id)?;
                }

                true
            }
            None => false,
        };

        write_txn.commit()?;
        Ok(deleted)
    }

    /// Files whose expiry is older than `cutoff`, up to `limit`. The caller
    /// passes a cutoff in the past to give in-flight downloads a grace
    /// window before their blob disappears.
    pub fn expired_files(
        &self,
        cutoff: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<FileRecord>, DatabaseError> {
        let read_txn = self.begin_read()?;
        let table = read_txn.open_table(FILES)?;

        let mut expired = Vec::new();
        for result in table.iter()? {
            let (_, value) = result?;
            let file: FileRecord = rmp_serde::from_slice(value.value())?;
            if file.expires_at < cutoff {
                expired.push(file);
                if expired.len() >= limit {
                    break;
                }
            }
        }

        Ok(expired)
    }
}
