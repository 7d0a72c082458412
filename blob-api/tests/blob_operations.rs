use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;

use blob_api::{
    AccessTier, BlobCtx, BlobError, BlobOperations, ByteStream, ClientCache, DownloadFault, MemoryBackend, Payload,
    ServiceHandle, StorageConfig, StreamCollector, UploadOptions,
};

/// Test factory functions
fn create_test_operations(backend: MemoryBackend) -> BlobOperations {
    let config = StorageConfig::new().with_account("devaccount");
    let service = ServiceHandle::new(&config, backend).unwrap();
    BlobOperations::new(Arc::new(ClientCache::new(service)))
}

fn chunked_stream(parts: &[&'static [u8]]) -> ByteStream {
    let items: Vec<Result<Bytes, std::io::Error>> = parts.iter().map(|p| Ok(Bytes::from_static(*p))).collect();
    Box::pin(futures::stream::iter(items))
}

async fn create_container_with_blob(ops: &BlobOperations, ctx: &BlobCtx, data: &'static str) {
    ops.create_container(ctx, "c").await.unwrap();
    ops.upload_blob(ctx, "c", "b", Payload::text(data), UploadOptions::new())
        .await
        .unwrap();
}

#[test]
fn test_missing_account_fails_at_startup() {
    let result = ServiceHandle::new(&StorageConfig::new(), MemoryBackend::new());
    assert!(matches!(result, Err(BlobError::Configuration { .. })));
}

#[tokio::test]
async fn test_round_trip_preserves_content_and_properties() {
    let ops = create_test_operations(MemoryBackend::new());
    let ctx = BlobCtx::new();
    ops.create_container(&ctx, "c").await.unwrap();

    let options = UploadOptions::new()
        .with_tier(AccessTier::Hot)
        .with_content_type("text/plain")
        .with_metadata("filename", "xyz.txt");
    let outcome = ops
        .upload_blob(&ctx, "c", "xyz", Payload::text("XYZ"), options)
        .await
        .unwrap();
    assert_eq!(outcome.size_bytes, 3);

    let download = ops.get_blob_buffer(&ctx, "c", "xyz").await.unwrap();
    assert_eq!(download.buffer().map(|b| &b[..]), Some(&b"XYZ"[..]));
    assert_eq!(download.content_type.as_deref(), Some("text/plain"));
    assert_eq!(download.metadata.get("filename").map(String::as_str), Some("xyz.txt"));
    assert_eq!(download.filename(), "xyz.txt");
    assert_eq!(download.etag, outcome.etag);
    assert_eq!(download.content_length, Some(3));
}

#[tokio::test]
async fn test_stream_payload_upload_and_chunked_download() {
    let backend = MemoryBackend::new().with_download_chunk_size(2);
    let ops = create_test_operations(backend);
    let ctx = BlobCtx::new();
    ops.create_container(&ctx, "c").await.unwrap();

    let payload = Payload::stream(|| chunked_stream(&[b"ab", b"", b"cde"]));
    let outcome = ops
        .upload_blob(&ctx, "c", "s", payload, UploadOptions::new())
        .await
        .unwrap();
    assert_eq!(outcome.size_bytes, 5);

    let download = ops.get_blob_stream(&ctx, "c", "s").await.unwrap();
    assert!(!download.is_buffered());

    let mut stream = download.into_stream();
    let mut chunks = Vec::new();
    while let Some(chunk) = stream.next().await {
        chunks.push(chunk.unwrap());
    }
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks.concat(), b"abcde".to_vec());
}

#[tokio::test]
async fn test_stream_download_pipes_into_sink() {
    let ops = create_test_operations(MemoryBackend::new().with_download_chunk_size(1));
    let ctx = BlobCtx::new();
    create_container_with_blob(&ops, &ctx, "hello").await;

    let download = ops.get_blob_stream(&ctx, "c", "b").await.unwrap();
    let mut sink: Vec<u8> = Vec::new();
    let written = StreamCollector::pipe(download.into_stream(), &mut sink).await.unwrap();

    assert_eq!(written, 5);
    assert_eq!(sink, b"hello");
}

#[tokio::test]
async fn test_broken_download_surfaces_stream_error() {
    let backend = MemoryBackend::new()
        .with_download_chunk_size(1)
        .with_download_fault(DownloadFault::ErrorAfterChunks(2));
    let ops = create_test_operations(backend);
    let ctx = BlobCtx::new();
    create_container_with_blob(&ops, &ctx, "abcdef").await;

    let result = ops.get_blob_buffer(&ctx, "c", "b").await;
    assert!(matches!(result, Err(BlobError::Stream { .. })));
}

#[tokio::test]
async fn test_truncated_download_is_not_silent() {
    let backend = MemoryBackend::new().with_download_fault(DownloadFault::TruncateAt(2));
    let ops = create_test_operations(backend);
    let ctx = BlobCtx::new();
    create_container_with_blob(&ops, &ctx, "abcdef").await;

    let result = ops.get_blob_buffer(&ctx, "c", "b").await;
    assert!(matches!(result, Err(BlobError::Stream { .. })));
}

#[tokio::test]
async fn test_cancelled_stream_signals_incompleteness() {
    let ops = create_test_operations(MemoryBackend::new().with_download_chunk_size(1));
    let ctx = BlobCtx::new();
    create_container_with_blob(&ops, &ctx, "abcdef").await;

    let download = ops.get_blob_stream(&ctx, "c", "b").await.unwrap();
    let mut stream = download.into_stream();
    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(&first[..], b"a");

    ctx.cancel.cancel();
    let next = stream.next().await.unwrap();
    assert_eq!(next.unwrap_err().kind(), std::io::ErrorKind::Interrupted);
}

#[tokio::test]
async fn test_delete_container_invalidates_cache() {
    let ops = create_test_operations(MemoryBackend::new());
    let ctx = BlobCtx::new();
    ops.create_container(&ctx, "c").await.unwrap();

    let before = ops.cache().container("c");
    let deleted = ops.delete_container(&ctx, "c").await.unwrap();
    assert!(deleted.is_some());
    assert!(!ops.cache().contains("c"));

    let after = ops.cache().container("c");
    assert!(!Arc::ptr_eq(&before, &after));

    // the container is really gone
    assert!(ops.list_containers(&ctx).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_missing_blob_is_not_found() {
    let ops = create_test_operations(MemoryBackend::new());
    let ctx = BlobCtx::new();
    ops.create_container(&ctx, "c").await.unwrap();

    let result = ops.delete_blob(&ctx, "c", "missing").await;
    assert!(matches!(result, Err(BlobError::NotFound { .. })));
}

#[tokio::test]
async fn test_properties_of_missing_blob_is_not_found() {
    let ops = create_test_operations(MemoryBackend::new());
    let ctx = BlobCtx::new();
    ops.create_container(&ctx, "c").await.unwrap();

    let result = ops.get_blob_properties(&ctx, "c", "missing").await;
    assert!(matches!(result, Err(BlobError::NotFound { .. })));

    let download = ops.get_blob_buffer(&ctx, "c", "missing").await;
    assert!(matches!(download, Err(BlobError::NotFound { .. })));
}

#[tokio::test]
async fn test_delete_blob_then_properties() {
    let ops = create_test_operations(MemoryBackend::new());
    let ctx = BlobCtx::new();
    create_container_with_blob(&ops, &ctx, "data").await;

    let response = ops.delete_blob(&ctx, "c", "b").await.unwrap();
    assert!(response.request_id.is_some());

    let result = ops.get_blob_properties(&ctx, "c", "b").await;
    assert!(result.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_upload_into_missing_container_propagates() {
    let ops = create_test_operations(MemoryBackend::new());
    let result = ops
        .upload_blob(&BlobCtx::new(), "ghost", "b", Payload::text("x"), UploadOptions::new())
        .await;
    assert!(matches!(result, Err(BlobError::NotFound { .. })));
}

#[tokio::test]
async fn test_list_blobs_in_listing_order_with_properties() {
    let ops = create_test_operations(MemoryBackend::new());
    let ctx = BlobCtx::new();
    ops.create_container(&ctx, "c").await.unwrap();

    for (name, ct) in [("b.txt", "text/plain"), ("a.jpg", "image/jpeg")] {
        let options = UploadOptions::new().with_content_type(ct).with_metadata("filename", name);
        ops.upload_blob(&ctx, "c", name, Payload::buffer(vec![1u8, 2, 3]), options)
            .await
            .unwrap();
    }

    let listing = ops.list_blobs(&ctx, "c").await.unwrap();
    let names: Vec<&str> = listing.entries().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a.jpg", "b.txt"]);

    let first = &listing.entries()[0].properties;
    assert_eq!(first.content_type.as_deref(), Some("image/jpeg"));
    assert_eq!(first.content_length, 3);
    assert!(first.etag.is_some());
}

#[tokio::test]
async fn test_upload_records_access_tier() {
    let backend = MemoryBackend::new();
    let ops = create_test_operations(backend.clone());
    let ctx = BlobCtx::new();
    ops.create_container(&ctx, "c").await.unwrap();

    let options = UploadOptions::new().with_tier(AccessTier::Cool);
    ops.upload_blob(&ctx, "c", "b", Payload::text("x"), options)
        .await
        .unwrap();

    assert_eq!(backend.tier_of("c", "b"), Some(AccessTier::Cool));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_share_container_handle() {
    let ops = create_test_operations(MemoryBackend::new());
    let ctx = BlobCtx::new();
    ops.create_container(&ctx, "shared").await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..16 {
        let ops = ops.clone();
        let ctx = ctx.child();
        tasks.push(tokio::spawn(async move {
            let name = format!("blob-{}", i);
            ops.upload_blob(&ctx, "shared", &name, Payload::text(name.clone()), UploadOptions::new())
                .await
                .unwrap();
            ops.cache().container("shared")
        }));
    }

    let cached = ops.cache().container("shared");
    for task in tasks {
        assert!(Arc::ptr_eq(&task.await.unwrap(), &cached));
    }
    assert_eq!(ops.cache().len(), 1);
    assert_eq!(ops.list_blobs(&ctx, "shared").await.unwrap().entries().len(), 16);
}
