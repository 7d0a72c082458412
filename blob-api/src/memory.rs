use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::backend::{DownloadResponse, StorageBackend, UploadResponse};
use crate::{
    AccessTier, BlobError, BlobItem, BlobProperties, BlobResult, ByteStream, ContainerItem, Metadata,
    ServiceResponse, UploadOptions,
};

/// Fault to inject into downloads, for exercising stream failure paths
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadFault {
    /// Emit an I/O error after this many chunks
    ErrorAfterChunks(usize),
    /// Announce the full length but end the body after this many bytes
    TruncateAt(usize),
}

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Bytes,
    content_type: Option<String>,
    metadata: Metadata,
    tier: Option<AccessTier>,
    etag: String,
    last_modified: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoredContainer {
    blobs: BTreeMap<String, StoredBlob>,
    created_at: Option<DateTime<Utc>>,
}

/// In-memory backend for testing and development
#[derive(Clone)]
pub struct MemoryBackend {
    containers: Arc<RwLock<BTreeMap<String, StoredContainer>>>,
    etag_seq: Arc<AtomicU64>,
    chunk_size: usize,
    fault: Option<DownloadFault>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            containers: Arc::new(RwLock::new(BTreeMap::new())),
            etag_seq: Arc::new(AtomicU64::new(1)),
            chunk_size: 64 * 1024,
            fault: None,
        }
    }

    /// Split download bodies into chunks of at most `bytes`
    pub fn with_download_chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    pub fn with_download_fault(mut self, fault: DownloadFault) -> Self {
        self.fault = Some(fault);
        self
    }

    /// Access tier recorded for a blob, if any
    pub fn tier_of(&self, container: &str, blob: &str) -> Option<AccessTier> {
        self.containers
            .read()
            .get(container)
            .and_then(|c| c.blobs.get(blob))
            .and_then(|b| b.tier)
    }

    fn request_id() -> Option<String> {
        Some(Uuid::new_v4().to_string())
    }

    fn next_etag(&self) -> String {
        format!("\"0x{:016X}\"", self.etag_seq.fetch_add(1, Ordering::SeqCst))
    }

    fn body_stream(&self, data: Bytes) -> (ByteStream, u64) {
        let announced = data.len() as u64;
        let data = match self.fault {
            Some(DownloadFault::TruncateAt(at)) => data.slice(..at.min(data.len())),
            _ => data,
        };

        let mut chunks: Vec<Result<Bytes, std::io::Error>> = Vec::new();
        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + self.chunk_size).min(data.len());
            chunks.push(Ok(data.slice(offset..end)));
            offset = end;
        }
        if let Some(DownloadFault::ErrorAfterChunks(n)) = self.fault {
            chunks.truncate(n);
            chunks.push(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "injected download failure",
            )));
        }

        let stream: ByteStream = Box::pin(futures::stream::iter(chunks));
        (stream, announced)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn list_containers(&self) -> BlobResult<Vec<ContainerItem>> {
        let containers = self.containers.read();
        Ok(containers
            .iter()
            .map(|(name, container)| ContainerItem {
                name: name.clone(),
                last_modified: container.created_at,
            })
            .collect())
    }

    async fn container_exists(&self, container: &str) -> BlobResult<bool> {
        Ok(self.containers.read().contains_key(container))
    }

    async fn create_container(&self, container: &str) -> BlobResult<ServiceResponse> {
        let mut containers = self.containers.write();
        if containers.contains_key(container) {
            return Err(BlobError::conflict(format!("container {}", container)));
        }
        containers.insert(
            container.to_string(),
            StoredContainer {
                blobs: BTreeMap::new(),
                created_at: Some(Utc::now()),
            },
        );
        Ok(ServiceResponse::new(Self::request_id()))
    }

    async fn delete_container(&self, container: &str) -> BlobResult<ServiceResponse> {
        self.containers
            .write()
            .remove(container)
            .map(|_| ServiceResponse::new(Self::request_id()))
            .ok_or_else(|| BlobError::not_found(format!("container {}", container)))
    }

    async fn list_blobs(&self, container: &str) -> BlobResult<Vec<BlobItem>> {
        let containers = self.containers.read();
        let stored = containers
            .get(container)
            .ok_or_else(|| BlobError::not_found(format!("container {}", container)))?;
        Ok(stored
            .blobs
            .iter()
            .map(|(name, blob)| BlobItem {
                name: name.clone(),
                size_bytes: blob.data.len() as u64,
            })
            .collect())
    }

    async fn blob_exists(&self, container: &str, blob: &str) -> BlobResult<bool> {
        Ok(self
            .containers
            .read()
            .get(container)
            .map_or(false, |c| c.blobs.contains_key(blob)))
    }

    async fn upload(
        &self,
        container: &str,
        blob: &str,
        body: Bytes,
        content_length: u64,
        options: &UploadOptions,
    ) -> BlobResult<UploadResponse> {
        if body.len() as u64 != content_length {
            return Err(BlobError::invalid(format!(
                "content length {} does not match body of {} bytes",
                content_length,
                body.len()
            )));
        }

        let etag = self.next_etag();
        let mut containers = self.containers.write();
        let stored = containers
            .get_mut(container)
            .ok_or_else(|| BlobError::not_found(format!("container {}", container)))?;
        stored.blobs.insert(
            blob.to_string(),
            StoredBlob {
                data: body,
                content_type: options.content_type.clone(),
                metadata: options.metadata.clone(),
                tier: options.tier,
                etag: etag.clone(),
                last_modified: Utc::now(),
            },
        );

        Ok(UploadResponse {
            etag: Some(etag),
            request_id: Self::request_id(),
        })
    }

    async fn get_properties(&self, container: &str, blob: &str) -> BlobResult<BlobProperties> {
        let containers = self.containers.read();
        let stored = containers
            .get(container)
            .and_then(|c| c.blobs.get(blob))
            .ok_or_else(|| BlobError::not_found(format!("blob {}/{}", container, blob)))?;

        Ok(BlobProperties {
            metadata: stored.metadata.clone(),
            etag: Some(stored.etag.clone()),
            content_type: stored.content_type.clone(),
            request_id: Self::request_id(),
            content_length: stored.data.len() as u64,
            last_modified: Some(stored.last_modified),
        })
    }

    async fn download(&self, container: &str, blob: &str) -> BlobResult<DownloadResponse> {
        let data = {
            let containers = self.containers.read();
            containers
                .get(container)
                .and_then(|c| c.blobs.get(blob))
                .map(|b| b.data.clone())
                .ok_or_else(|| BlobError::not_found(format!("blob {}/{}", container, blob)))?
        };

        let (body, announced) = self.body_stream(data);
        Ok(DownloadResponse {
            body: Some(body),
            content_length: Some(announced),
            request_id: Self::request_id(),
        })
    }

    async fn delete_blob(&self, container: &str, blob: &str) -> BlobResult<ServiceResponse> {
        self.containers
            .write()
            .get_mut(container)
            .and_then(|c| c.blobs.remove(blob))
            .map(|_| ServiceResponse::new(Self::request_id()))
            .ok_or_else(|| BlobError::not_found(format!("blob {}/{}", container, blob)))
    }
}
