use bytes::Bytes;
use file_share::object_store::{LocalStore, ObjectStore, ObjectStoreError};
use futures::TryStreamExt;

#[tokio::test]
async fn test_local_store_put_stat() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let data = Bytes::from("hello world");
    store
        .put("bucket", "test-key", data.clone(), "text/plain")
        .await
        .unwrap();

    let stat = store.stat("bucket", "test-key").await.unwrap();
    assert_eq!(stat.size, data.len() as u64);
}

#[tokio::test]
async fn test_local_store_stat_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let result = store.stat("bucket", "missing").await;
    assert!(matches!(result, Err(ObjectStoreError::NotFound(_))));
}

#[tokio::test]
async fn test_local_store_open_stream_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let payload = Bytes::from(vec![7u8; 200 * 1024]); // spans multiple chunks
    store
        .put("bucket", "big", payload.clone(), "application/octet-stream")
        .await
        .unwrap();

    let stream = store.open_stream("bucket", "big").await.unwrap();
    let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();

    assert!(chunks.len() > 1, "large objects should stream in chunks");
    let total: usize = chunks.iter().map(|c| c.len()).sum();
    assert_eq!(total, payload.len());

    let reassembled: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
    assert_eq!(reassembled, payload.to_vec());
}

#[tokio::test]
async fn test_local_store_open_stream_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    let result = store.open_stream("bucket", "missing").await;
    assert!(matches!(result, Err(ObjectStoreError::NotFound(_))));
}

#[tokio::test]
async fn test_local_store_remove() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store
        .put("bucket", "to-delete", Bytes::from("data"), "text/plain")
        .await
        .unwrap();
    store.remove("bucket", "to-delete").await.unwrap();

    assert!(matches!(
        store.stat("bucket", "to-delete").await,
        Err(ObjectStoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_local_store_remove_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    // Removing an object that was never stored succeeds
    store.remove("bucket", "never-existed").await.unwrap();

    // And removing twice succeeds too
    store
        .put("bucket", "once", Bytes::from("data"), "text/plain")
        .await
        .unwrap();
    store.remove("bucket", "once").await.unwrap();
    store.remove("bucket", "once").await.unwrap();
}

#[tokio::test]
async fn test_local_store_buckets_are_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store
        .put("bucket-a", "key", Bytes::from("a"), "text/plain")
        .await
        .unwrap();

    assert!(store.stat("bucket-a", "key").await.is_ok());
    assert!(matches!(
        store.stat("bucket-b", "key").await,
        Err(ObjectStoreError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_local_store_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path()).unwrap();

    store
        .put("bucket", "key", Bytes::from("first"), "text/plain")
        .await
        .unwrap();
    store
        .put("bucket", "key", Bytes::from("second"), "text/plain")
        .await
        .unwrap();

    let stream = store.open_stream("bucket", "key").await.unwrap();
    let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
    let data: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
    assert_eq!(data, b"second");
}
