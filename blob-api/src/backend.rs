use async_trait::async_trait;
use bytes::Bytes;

use crate::{
    BlobItem, BlobProperties, BlobResult, ByteStream, ContainerItem, ServiceResponse, UploadOptions,
};

/// Remote object-storage operations - implemented by every storage backend.
///
/// Every call is one round trip. Failures are typed: absent resources map to
/// `BlobError::NotFound`, duplicate creates to `BlobError::Conflict`, and
/// everything else to `BlobError::Transport` with the remote request id.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// List containers in service order
    async fn list_containers(&self) -> BlobResult<Vec<ContainerItem>>;

    async fn container_exists(&self, container: &str) -> BlobResult<bool>;

    /// Create a container; `Conflict` if it already exists
    async fn create_container(&self, container: &str) -> BlobResult<ServiceResponse>;

    /// Delete a container and its blobs; `NotFound` if absent
    async fn delete_container(&self, container: &str) -> BlobResult<ServiceResponse>;

    /// List blobs in listing order; `NotFound` if the container is absent
    async fn list_blobs(&self, container: &str) -> BlobResult<Vec<BlobItem>>;

    async fn blob_exists(&self, container: &str, blob: &str) -> BlobResult<bool>;

    /// Create or overwrite a blob with a body of known length
    async fn upload(
        &self,
        container: &str,
        blob: &str,
        body: Bytes,
        content_length: u64,
        options: &UploadOptions,
    ) -> BlobResult<UploadResponse>;

    /// Blob properties without content
    async fn get_properties(&self, container: &str, blob: &str) -> BlobResult<BlobProperties>;

    /// Open a download; the body may be absent when the service sends none
    async fn download(&self, container: &str, blob: &str) -> BlobResult<DownloadResponse>;

    async fn delete_blob(&self, container: &str, blob: &str) -> BlobResult<ServiceResponse>;
}

/// Result of a successful upload
#[derive(Debug, Clone)]
pub struct UploadResponse {
    pub etag: Option<String>,
    pub request_id: Option<String>,
}

/// Result of opening a download
pub struct DownloadResponse {
    pub body: Option<ByteStream>,
    pub content_length: Option<u64>,
    pub request_id: Option<String>,
}

impl std::fmt::Debug for DownloadResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadResponse")
            .field("has_body", &self.body.is_some())
            .field("content_length", &self.content_length)
            .field("request_id", &self.request_id)
            .finish()
    }
}
