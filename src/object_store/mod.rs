mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Size and reported content type of a stored object.
#[derive(Debug, Clone)]
pub struct ObjectStat {
    pub size: u64,
    pub content_type: Option<String>,
}

/// Chunked object content. Dropping the stream releases the underlying
/// handle (file descriptor or HTTP connection), whichever way the consumer
/// exits.
pub type ByteStream = BoxStream<'static, Result<Bytes, ObjectStoreError>>;

/// Abstraction over object storage backends. Objects are addressed by
/// `(bucket, key)`; the blobs are meaningless without the metadata DB.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    /// Fails with `NotFound` if the object is absent.
    async fn stat(&self, bucket: &str, key: &str) -> Result<ObjectStat, ObjectStoreError>;

    async fn open_stream(&self, bucket: &str, key: &str) -> Result<ByteStream, ObjectStoreError>;

    /// Idempotent: removing an already-absent object succeeds.
    async fn remove(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError>;
}
