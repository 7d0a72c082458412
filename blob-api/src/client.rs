use std::sync::Arc;

use crate::backend::{DownloadResponse, StorageBackend, UploadResponse};
use crate::{
    BlobItem, BlobProperties, BlobResult, ContainerItem, ResolvedContent, ServiceResponse, StorageConfig,
    UploadOptions,
};

/// Root client for one storage account.
///
/// Cheap to clone; every clone shares the same backend capability.
#[derive(Clone)]
pub struct ServiceHandle {
    account_name: Arc<str>,
    backend: Arc<dyn StorageBackend>,
}

impl ServiceHandle {
    /// Bind a backend to the configured account; fails if no account was supplied
    pub fn new<B: StorageBackend + 'static>(config: &StorageConfig, backend: B) -> BlobResult<Self> {
        Self::from_backend(config, Arc::new(backend))
    }

    pub fn from_backend(config: &StorageConfig, backend: Arc<dyn StorageBackend>) -> BlobResult<Self> {
        let account_name = config.account()?;
        Ok(Self {
            account_name: Arc::from(account_name),
            backend,
        })
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Build a container client. Local only, no round trip.
    pub fn container_client(&self, container: &str) -> ContainerHandle {
        ContainerHandle {
            service: self.clone(),
            name: container.to_string(),
        }
    }

    pub async fn list_containers(&self) -> BlobResult<Vec<ContainerItem>> {
        self.backend.list_containers().await
    }
}

impl std::fmt::Debug for ServiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceHandle")
            .field("account_name", &self.account_name)
            .finish_non_exhaustive()
    }
}

/// Client scoped to one container
#[derive(Debug)]
pub struct ContainerHandle {
    service: ServiceHandle,
    name: String,
}

impl ContainerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &ServiceHandle {
        &self.service
    }

    /// Derive a blob client; not cached
    pub fn blob_client(self: &Arc<Self>, blob: &str) -> BlobHandle {
        BlobHandle {
            container: Arc::clone(self),
            name: blob.to_string(),
        }
    }

    pub async fn exists(&self) -> BlobResult<bool> {
        self.service.backend.container_exists(&self.name).await
    }

    pub async fn create(&self) -> BlobResult<ServiceResponse> {
        self.service.backend.create_container(&self.name).await
    }

    pub async fn delete(&self) -> BlobResult<ServiceResponse> {
        self.service.backend.delete_container(&self.name).await
    }

    pub async fn list_blobs(&self) -> BlobResult<Vec<BlobItem>> {
        self.service.backend.list_blobs(&self.name).await
    }
}

/// View of one blob inside a container
#[derive(Debug, Clone)]
pub struct BlobHandle {
    container: Arc<ContainerHandle>,
    name: String,
}

impl BlobHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn container(&self) -> &Arc<ContainerHandle> {
        &self.container
    }

    fn backend(&self) -> &dyn StorageBackend {
        self.container.service.backend.as_ref()
    }

    pub async fn exists(&self) -> BlobResult<bool> {
        self.backend().blob_exists(self.container.name(), &self.name).await
    }

    /// Upsert the resolved content
    pub async fn upload(&self, content: ResolvedContent, options: &UploadOptions) -> BlobResult<UploadResponse> {
        self.backend()
            .upload(self.container.name(), &self.name, content.body, content.length, options)
            .await
    }

    pub async fn properties(&self) -> BlobResult<BlobProperties> {
        self.backend().get_properties(self.container.name(), &self.name).await
    }

    pub async fn download(&self) -> BlobResult<DownloadResponse> {
        self.backend().download(self.container.name(), &self.name).await
    }

    pub async fn delete(&self) -> BlobResult<ServiceResponse> {
        self.backend().delete_blob(self.container.name(), &self.name).await
    }
}
