use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;

use super::{ByteStream, ObjectStat, ObjectStore, ObjectStoreError};

const CHUNK_SIZE: usize = 64 * 1024;

/// Local filesystem object store for development and testing. Buckets map to
/// subdirectories of the base path.
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Result<Self, std::io::Error> {
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    fn object_path(&self, bucket: &str, key: &str) -> PathBuf {
        self.base_path.join(bucket).join(key)
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let path = self.object_path(bucket, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        Ok(())
    }

    async fn stat(&self, bucket: &str, key: &str) -> Result<ObjectStat, ObjectStoreError> {
        let path = self.object_path(bucket, key);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(ObjectStat {
                size: meta.len(),
                content_type: None,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(ObjectStoreError::NotFound(format!("{bucket}/{key}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn open_stream(&self, bucket: &str, key: &str) -> Result<ByteStream, ObjectStoreError> {
        let path = self.object_path(bucket, key);
        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ObjectStoreError::NotFound(format!("{bucket}/{key}")))
            }
            Err(e) => return Err(e.into()),
        };

        let stream = ReaderStream::with_capacity(file, CHUNK_SIZE)
            .map_err(ObjectStoreError::from)
            .boxed();
        Ok(stream)
    }

    async fn remove(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        let path = self.object_path(bucket, key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            // Already gone counts as removed
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
